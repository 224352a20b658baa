//! Working-area staging of raw inputs.
//!
//! Copies are idempotent overwrites: a subject whose process was killed
//! mid-run can be retried without cleaning up first, and reruns converge on
//! the same working tree.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::naming::AcquisitionDescriptor;

/// Copy every file from the subject's raw `anat/` directory into the working
/// area. A missing source directory stages nothing; the existence gate
/// decides later whether that is fatal. Returns the staged paths, sorted.
pub fn stage_subject_anat(raw_anat: &Path, work_anat: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(work_anat).with_context(|| format!("create {}", work_anat.display()))?;

    let mut staged = Vec::new();
    if !raw_anat.is_dir() {
        return Ok(staged);
    }
    for entry in fs::read_dir(raw_anat).with_context(|| format!("read {}", raw_anat.display()))? {
        let entry = entry?;
        let source = entry.path();
        if !source.is_file() {
            continue;
        }
        let dest = work_anat.join(entry.file_name());
        copy_file(&source, &dest)?;
        staged.push(dest);
    }
    staged.sort();
    Ok(staged)
}

/// Copy the located ground-truth lesion mask into the working area under the
/// `-manual` suffix, marking it as the human reference rather than a model
/// output: `{descriptor}_lesion-manual.nii.gz`.
pub fn stage_manual_annotation(
    annotation: &Path,
    work_anat: &Path,
    descriptor: &AcquisitionDescriptor,
) -> Result<PathBuf> {
    let dest = work_anat.join(format!("{descriptor}_lesion-manual.nii.gz"));
    copy_file(annotation, &dest)?;
    Ok(dest)
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::copy(source, dest)
        .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
    Ok(())
}
