//! CLI argument parsing for the pipeline runner.
//!
//! The CLI is intentionally thin: the batch runner invokes `run` once per
//! subject with three positional parameters, and everything else (path roots)
//! arrives through the environment it exports.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "praxis-seg",
    version,
    about = "Per-subject spinal cord and lesion segmentation pipeline",
    after_help = "Environment:\n  PATH_DATA            BIDS data root (raw images and derivatives/labels)\n  PATH_DATA_PROCESSED  Working area for staged copies and outputs\n  PATH_RESULTS         Results root\n  PATH_LOG             Log root (missing_files.log, run summaries)\n  PATH_QC              QC report root\n\nExamples:\n  praxis-seg run sub-ott004 /opt/seg/segment.sh /opt/seg/model.pt\n  praxis-seg resolve sub-que008",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Resolve(ResolveArgs),
}

/// Run the full stage sequence for one subject.
#[derive(Parser, Debug)]
#[command(about = "Process one subject: stage, resolve, verify, segment")]
pub struct RunArgs {
    /// Subject identifier (optionally with a session sub-path, e.g. sub-x/ses-01)
    #[arg(value_name = "SUBJECT")]
    pub subject: String,

    /// External segmentation script invoked for both anatomical targets
    #[arg(value_name = "SCRIPT")]
    pub segment_script: PathBuf,

    /// Model passed through to the segmentation script
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,
}

/// Print the resolved acquisition descriptor for one subject.
///
/// Audit aid: shows which naming rule a subject hits without running any
/// stage, so missing-file log entries can be traced back to rule-table gaps.
#[derive(Parser, Debug)]
#[command(about = "Resolve and print a subject's acquisition descriptor")]
pub struct ResolveArgs {
    /// Subject identifier
    #[arg(value_name = "SUBJECT")]
    pub subject: String,
}
