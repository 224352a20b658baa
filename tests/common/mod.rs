//! Shared fixture for end-to-end pipeline tests.
//!
//! Builds a throwaway BIDS-style tree (raw images, derivatives/labels, the
//! working/log/results/qc roots) plus a stub segmentation script that records
//! which stages actually ran.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use praxis_seg::config::PipelinePaths;
use praxis_seg::gate::MissingFilesLog;
use praxis_seg::naming::{RuleSet, SubjectId};
use praxis_seg::segment::Segmenter;

pub struct PipelineFixture {
    _root: TempDir,
    pub paths: PipelinePaths,
    pub rules: RuleSet,
    script: PathBuf,
    model: PathBuf,
}

impl PipelineFixture {
    /// Create the tree with the data root under `data/{site}` so site-scoped
    /// rules see the site token.
    pub fn new(site: &str) -> Self {
        let root = TempDir::new().expect("create fixture root");
        let base = root.path();
        let data = base.join("data").join(site);
        let processed = base.join("data_processed");
        let results = base.join("results");
        let log = base.join("log");
        let qc = base.join("qc");
        for dir in [&data, &processed, &results, &log, &qc] {
            fs::create_dir_all(dir).expect("create fixture dir");
        }

        let paths = PipelinePaths::new(data, processed, results, log, qc);
        let rules = RuleSet::study_defaults().expect("default table is disjoint");
        let script = base.join("segment.sh");
        let model = base.join("model.pt");
        fs::write(&model, b"weights").expect("write model");

        Self {
            _root: root,
            paths,
            rules,
            script,
            model,
        }
    }

    pub fn subject(&self, id: &str) -> SubjectId {
        SubjectId::new(id)
    }

    pub fn write_raw_image(&self, subject: &SubjectId, file_name: &str) {
        let dir = self.paths.raw_anat_dir(subject);
        fs::create_dir_all(&dir).expect("create raw anat dir");
        fs::write(dir.join(file_name), b"nifti").expect("write raw image");
    }

    pub fn write_annotation(&self, subject: &SubjectId, file_name: &str) {
        let dir = self.paths.labels_anat_dir(subject);
        fs::create_dir_all(&dir).expect("create labels dir");
        fs::write(dir.join(file_name), b"mask").expect("write annotation");
    }

    /// Stub segmentation script. It drops a `ran_{task}` marker in its
    /// working directory before exiting, so tests can assert which stages
    /// executed and which were cut off by fail-fast.
    #[cfg(unix)]
    pub fn segmenter_with_exit(&self, exit_code: i32) -> Segmenter {
        use std::os::unix::fs::PermissionsExt;

        let body = format!("#!/bin/sh\ntouch \"ran_$1\"\nexit {exit_code}\n");
        fs::write(&self.script, body).expect("write stub script");
        let mut perms = fs::metadata(&self.script)
            .expect("stat stub script")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&self.script, perms).expect("chmod stub script");

        Segmenter::new(self.script.clone(), self.model.clone())
    }

    /// Segmenter pointing at a script that was never written. Usable only in
    /// scenarios that must fail before any segmentation stage runs.
    pub fn segmenter_never_invoked(&self) -> Segmenter {
        Segmenter::new(self.script.clone(), self.model.clone())
    }

    pub fn log(&self) -> MissingFilesLog {
        MissingFilesLog::new(self.paths.log_root())
    }

    pub fn log_lines(&self) -> Vec<String> {
        let path = self.paths.log_root().join("missing_files.log");
        if !path.is_file() {
            return Vec::new();
        }
        fs::read_to_string(path)
            .expect("read missing-files log")
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn stage_marker(&self, subject: &SubjectId, task: &str) -> PathBuf {
        self.paths
            .work_anat_dir(subject)
            .join(format!("ran_{task}"))
    }
}
