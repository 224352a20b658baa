//! Per-subject stage orchestration.
//!
//! One subject, one strictly ordered sequence, no retries: the first stage
//! that fails aborts everything after it. The batch runner handles
//! cross-subject isolation; this module only decides whether *this* subject
//! can be processed.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use crate::annotations::{locate_annotation, Category};
use crate::config::PipelinePaths;
use crate::gate::{ensure_input_exists, MissingFileSink};
use crate::naming::{RuleSet, SubjectId};
use crate::segment::Segmenter;
use crate::staging::{stage_manual_annotation, stage_subject_anat};

/// Per-subject state machine. States advance in order; any stage failure
/// transitions to `Failed`, which is terminal. No state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Start,
    Staged,
    Resolved,
    InputVerified,
    GtRetrieved,
    ScSegmented,
    LesionSegmented,
    Done,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageState::Start => "START",
            StageState::Staged => "STAGED",
            StageState::Resolved => "RESOLVED",
            StageState::InputVerified => "INPUT_VERIFIED",
            StageState::GtRetrieved => "GT_RETRIEVED",
            StageState::ScSegmented => "SC_SEGMENTED",
            StageState::LesionSegmented => "LESION_SEGMENTED",
            StageState::Done => "DONE",
            StageState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Audit record emitted on full success. Observational only: it never feeds
/// back into control flow.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub subject: String,
    pub descriptor: String,
    pub duration_seconds: f64,
    pub tool_version: String,
    pub host: String,
}

impl RunSummary {
    pub fn render(&self) -> String {
        format!(
            "{} v{} on {}: {} ({}) completed in {:.1}s",
            env!("CARGO_PKG_NAME"),
            self.tool_version,
            self.host,
            self.subject,
            self.descriptor,
            self.duration_seconds
        )
    }
}

/// Run the whole stage sequence for one subject.
pub fn run_subject(
    paths: &PipelinePaths,
    rules: &RuleSet,
    subject: &SubjectId,
    segmenter: &Segmenter,
    sink: &mut dyn MissingFileSink,
) -> Result<RunSummary> {
    let started = Instant::now();
    let mut state = StageState::Start;

    let result = run_stages(paths, rules, subject, segmenter, sink, &mut state);
    match result {
        Ok(descriptor) => {
            state = StageState::Done;
            tracing::info!("{subject}: {state}");
            let summary = RunSummary {
                subject: subject.raw().to_string(),
                descriptor,
                duration_seconds: started.elapsed().as_secs_f64(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                host: host_identity(),
            };
            write_summary(paths, subject, &summary);
            Ok(summary)
        }
        Err(err) => {
            let failed_at = state;
            state = StageState::Failed;
            tracing::error!("{subject}: {state} (was {failed_at}): {err:#}");
            Err(err)
        }
    }
}

fn run_stages(
    paths: &PipelinePaths,
    rules: &RuleSet,
    subject: &SubjectId,
    segmenter: &Segmenter,
    sink: &mut dyn MissingFileSink,
    state: &mut StageState,
) -> Result<String> {
    let work_anat = paths.work_anat_dir(subject);
    let labels_anat = paths.labels_anat_dir(subject);

    // (a) Stage the subject's raw acquisitions into the working area.
    let staged = stage_subject_anat(&paths.raw_anat_dir(subject), &work_anat)
        .with_context(|| format!("stage raw data for {subject}"))?;
    advance(subject, state, StageState::Staged);
    tracing::debug!("{subject}: staged {} file(s)", staged.len());

    // (b) Resolve which acquisition is canonical for this subject.
    let descriptor = rules.resolve(subject, paths.site().as_ref(), &labels_anat);
    advance(subject, state, StageState::Resolved);
    tracing::info!("{subject}: resolved acquisition {descriptor}");

    // (c) The resolved image must exist in the working area.
    let image: PathBuf = work_anat.join(descriptor.image_name());
    ensure_input_exists(&image, subject.raw(), sink)?;
    advance(subject, state, StageState::InputVerified);

    // (d) Ground truth is mandatory; copy it in as the manual reference.
    let annotation = locate_annotation(
        paths.data_root(),
        subject,
        &descriptor,
        Category::Lesion,
        sink,
    )?;
    stage_manual_annotation(&annotation, &work_anat, &descriptor)
        .with_context(|| format!("stage manual annotation for {subject}"))?;
    advance(subject, state, StageState::GtRetrieved);

    // (e) then (f): the two segmentation targets, strictly in order.
    segmenter.segment_spinal_cord(&image, &work_anat)?;
    advance(subject, state, StageState::ScSegmented);

    segmenter.segment_lesion(&image, &work_anat)?;
    advance(subject, state, StageState::LesionSegmented);

    Ok(descriptor.as_str().to_string())
}

fn advance(subject: &SubjectId, state: &mut StageState, next: StageState) {
    *state = next;
    tracing::debug!("{subject}: {next}");
}

fn write_summary(paths: &PipelinePaths, subject: &SubjectId, summary: &RunSummary) {
    let path = paths.summary_path(subject);
    let result = serde_json::to_string_pretty(summary)
        .context("serialize run summary")
        .and_then(|json| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))
        });
    // Audit output must never fail the run.
    if let Err(err) = result {
        tracing::warn!("{subject}: could not write run summary: {err:#}");
    }
}

fn host_identity() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string())
}
