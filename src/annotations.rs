//! Ground-truth annotation lookup in the derivatives tree.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::gate::{ensure_annotation_exists, MissingFileSink};
use crate::naming::{AcquisitionDescriptor, SubjectId};

/// Annotation categories in the naming scheme. Only the lesion mask is
/// retrieved here; the spinal-cord mask (`_seg`) is produced by the
/// segmentation stage, never looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lesion,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Lesion => "lesion",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Path of the ground-truth annotation for one acquisition:
/// `{data_root}/derivatives/labels/{subject}/anat/{descriptor}_{category}.nii.gz`.
pub fn annotation_path(
    data_root: &Path,
    subject: &SubjectId,
    descriptor: &AcquisitionDescriptor,
    category: Category,
) -> PathBuf {
    data_root
        .join("derivatives")
        .join("labels")
        .join(subject.raw())
        .join("anat")
        .join(descriptor.annotation_name(category.label()))
}

/// Locate the annotation and enforce its presence. Every subject entering the
/// pipeline is assumed to have ground truth, so absence is always fatal —
/// there is no skip-if-missing policy.
pub fn locate_annotation(
    data_root: &Path,
    subject: &SubjectId,
    descriptor: &AcquisitionDescriptor,
    category: Category,
    sink: &mut dyn MissingFileSink,
) -> Result<PathBuf, PipelineError> {
    let path = annotation_path(data_root, subject, descriptor, category);
    ensure_annotation_exists(&path, subject.raw(), sink)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::RuleSet;
    use anyhow::Result;

    #[derive(Default)]
    struct MemorySink {
        records: usize,
    }

    impl MissingFileSink for MemorySink {
        fn record(&mut self, _subject: &str, _path: &Path) -> Result<()> {
            self.records += 1;
            Ok(())
        }
    }

    fn descriptor_for(subject: &SubjectId) -> AcquisitionDescriptor {
        RuleSet::study_defaults()
            .expect("default table is disjoint")
            .resolve(subject, None, Path::new("/nonexistent"))
    }

    #[test]
    fn builds_derivatives_path() {
        let subject = SubjectId::new("sub-abc001");
        let descriptor = descriptor_for(&subject);
        let path = annotation_path(
            Path::new("/data/site_003"),
            &subject,
            &descriptor,
            Category::Lesion,
        );
        assert_eq!(
            path,
            PathBuf::from(
                "/data/site_003/derivatives/labels/sub-abc001/anat/sub-abc001_acq-sag_T2w_lesion.nii.gz"
            )
        );
    }

    #[test]
    fn absent_annotation_always_fails() {
        let subject = SubjectId::new("sub-abc001");
        let descriptor = descriptor_for(&subject);
        let mut sink = MemorySink::default();
        let result = locate_annotation(
            Path::new("/nonexistent"),
            &subject,
            &descriptor,
            Category::Lesion,
            &mut sink,
        );
        assert!(matches!(
            result,
            Err(PipelineError::MissingAnnotation { .. })
        ));
        assert_eq!(sink.records, 1);
    }
}
