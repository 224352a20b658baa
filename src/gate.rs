//! Existence gate over resolved paths, backed by a shared missing-files log.
//!
//! The log is process-wide across the whole batch (every subject appends to
//! the same file), so appends are line-atomic: one formed line, one
//! `write_all` on an append-mode handle. It is write-only from this crate's
//! point of view; humans read it afterwards to decide which subjects need a
//! new naming exception.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Append-only sink for missing-file events. Injected so the gate can be
/// tested against an in-memory sink, and so the orchestrator owns the choice
/// of where the durable log lives.
pub trait MissingFileSink {
    fn record(&mut self, subject: &str, path: &Path) -> Result<()>;
}

/// The durable sink: `{log_root}/missing_files.log`.
pub struct MissingFilesLog {
    path: PathBuf,
}

impl MissingFilesLog {
    pub fn new(log_root: &Path) -> Self {
        Self {
            path: log_root.join("missing_files.log"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MissingFileSink for MissingFilesLog {
    fn record(&mut self, _subject: &str, path: &Path) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let line = format!("File {} does not exist\n", path.display());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        Ok(())
    }
}

/// Verify that a resolved input image actually exists. Absence is recorded
/// once in the sink and is fatal for the subject.
pub fn ensure_input_exists(
    path: &Path,
    subject: &str,
    sink: &mut dyn MissingFileSink,
) -> Result<(), PipelineError> {
    if path.is_file() {
        return Ok(());
    }
    record_missing(path, subject, sink);
    Err(PipelineError::MissingInput {
        subject: subject.to_string(),
        path: path.to_path_buf(),
    })
}

/// Same check for a ground-truth annotation. Kept as a distinct error variant
/// because annotation absence is never skippable downstream.
pub fn ensure_annotation_exists(
    path: &Path,
    subject: &str,
    sink: &mut dyn MissingFileSink,
) -> Result<(), PipelineError> {
    if path.is_file() {
        return Ok(());
    }
    record_missing(path, subject, sink);
    Err(PipelineError::MissingAnnotation {
        subject: subject.to_string(),
        path: path.to_path_buf(),
    })
}

fn record_missing(path: &Path, subject: &str, sink: &mut dyn MissingFileSink) {
    // The durable record matters more than the error that follows it, but a
    // sink failure must not mask the missing file itself.
    if let Err(err) = sink.record(subject, path) {
        tracing::warn!("failed to record missing file {}: {err:#}", path.display());
    }
}
