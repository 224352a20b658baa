//! Error taxonomy for the per-subject pipeline.
//!
//! Every variant is fatal for the subject being processed; there are no
//! retries anywhere in this crate. The batch runner isolates failures across
//! subjects, so "fatal" here means "this subject's run stops now".

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Resolved acquisition image is absent from the working area.
    #[error("File {} does not exist", path.display())]
    MissingInput { subject: String, path: PathBuf },

    /// Ground-truth annotation is absent. Never substituted with a default.
    #[error("File {} does not exist", path.display())]
    MissingAnnotation { subject: String, path: PathBuf },

    /// Malformed static rule table (overlapping override patterns). A
    /// programming-time defect, not a data condition.
    #[error("naming rule configuration error: {0}")]
    Configuration(String),

    /// The external segmentation script failed.
    #[error("{stage} failed with exit code {code:?}")]
    ExternalStage { stage: String, code: Option<i32> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}