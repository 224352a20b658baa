//! Invocation of the external segmentation script.
//!
//! The model is opaque here: one executable, invoked once per anatomical
//! target, blocking until it finishes. Output artifacts are named by
//! convention from the acquisition descriptor and written by the script
//! itself into the working directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PipelineError;

/// Orientation hint passed to the lesion stage; every acquisition handled by
/// this pipeline is a sagittal T2w.
pub const LESION_ORIENTATION: &str = "sagittal";

/// Handle on the external segmentation tool.
pub struct Segmenter {
    script: PathBuf,
    model: PathBuf,
}

impl Segmenter {
    pub fn new(script: PathBuf, model: PathBuf) -> Self {
        Self { script, model }
    }

    /// Segment the spinal cord. Writes `{descriptor}_seg.nii.gz` beside the
    /// image.
    pub fn segment_spinal_cord(
        &self,
        image: &Path,
        work_dir: &Path,
    ) -> Result<(), PipelineError> {
        self.invoke("spinal cord segmentation", work_dir, |cmd| {
            cmd.arg("sc-seg").arg("--image").arg(image);
        })
    }

    /// Segment the lesion. Writes `{descriptor}_lesion_seg.nii.gz` beside the
    /// image.
    pub fn segment_lesion(&self, image: &Path, work_dir: &Path) -> Result<(), PipelineError> {
        self.invoke("lesion segmentation", work_dir, |cmd| {
            cmd.arg("lesion-seg")
                .arg("--image")
                .arg(image)
                .arg("--orientation")
                .arg(LESION_ORIENTATION);
        })
    }

    fn invoke(
        &self,
        stage: &str,
        work_dir: &Path,
        configure: impl FnOnce(&mut Command),
    ) -> Result<(), PipelineError> {
        let mut cmd = Command::new(&self.script);
        configure(&mut cmd);
        cmd.arg("--model").arg(&self.model).current_dir(work_dir);

        tracing::info!("running {stage} via {}", self.script.display());
        let status = cmd.status()?;
        if !status.success() {
            tracing::error!("{stage} exited with {status}");
            return Err(PipelineError::ExternalStage {
                stage: stage.to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }
}
