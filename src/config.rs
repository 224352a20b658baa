//! Environment-supplied path roots.
//!
//! The batch runner exports one root per concern before invoking this tool
//! once per subject. Collecting them into a single struct up front keeps the
//! orchestrator free of `std::env` and makes every derived path auditable in
//! one place.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::naming::{Site, SubjectId};

pub const ENV_DATA: &str = "PATH_DATA";
pub const ENV_DATA_PROCESSED: &str = "PATH_DATA_PROCESSED";
pub const ENV_RESULTS: &str = "PATH_RESULTS";
pub const ENV_LOG: &str = "PATH_LOG";
pub const ENV_QC: &str = "PATH_QC";

/// The five roots the batch runner provides.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    data: PathBuf,
    processed: PathBuf,
    results: PathBuf,
    log: PathBuf,
    qc: PathBuf,
}

impl PipelinePaths {
    pub fn new(
        data: PathBuf,
        processed: PathBuf,
        results: PathBuf,
        log: PathBuf,
        qc: PathBuf,
    ) -> Self {
        Self {
            data,
            processed,
            results,
            log,
            qc,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            root_from_env(ENV_DATA)?,
            root_from_env(ENV_DATA_PROCESSED)?,
            root_from_env(ENV_RESULTS)?,
            root_from_env(ENV_LOG)?,
            root_from_env(ENV_QC)?,
        ))
    }

    pub fn data_root(&self) -> &Path {
        &self.data
    }

    pub fn results_root(&self) -> &Path {
        &self.results
    }

    pub fn log_root(&self) -> &Path {
        &self.log
    }

    pub fn qc_root(&self) -> &Path {
        &self.qc
    }

    /// Site token embedded in the data root, if any. Sites without a token
    /// simply never match site-scoped rules.
    pub fn site(&self) -> Option<Site> {
        Site::from_path(&self.data)
    }

    /// Raw acquisitions for one subject: `{data}/{subject}/anat`.
    pub fn raw_anat_dir(&self, subject: &SubjectId) -> PathBuf {
        self.data.join(subject.raw()).join("anat")
    }

    /// Working-area copy of the same directory under the processed root.
    pub fn work_anat_dir(&self, subject: &SubjectId) -> PathBuf {
        self.processed.join(subject.raw()).join("anat")
    }

    /// Annotation tree for one subject:
    /// `{data}/derivatives/labels/{subject}/anat`.
    pub fn labels_anat_dir(&self, subject: &SubjectId) -> PathBuf {
        self.data
            .join("derivatives")
            .join("labels")
            .join(subject.raw())
            .join("anat")
    }

    /// Machine-readable run summary for one subject under the log root.
    pub fn summary_path(&self, subject: &SubjectId) -> PathBuf {
        self.log.join(format!("{}_summary.json", subject.flat()))
    }
}

fn root_from_env(var: &str) -> Result<PathBuf> {
    let value = env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("environment variable {var} is empty");
    }
    Ok(PathBuf::from(trimmed))
}
