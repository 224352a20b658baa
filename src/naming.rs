//! Deterministic resolution of the canonical acquisition filename.
//!
//! Multi-site acquisitions are inconsistently named: some subjects have
//! duplicated runs that need an explicit index, one site embeds the run index
//! only in its annotation filenames, and one site spells the sagittal
//! acquisition token differently. All of those exceptions live here as an
//! ordered, declarative rule table so they can be audited and tested in
//! isolation from the orchestration.

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::PipelineError;

/// Acquisition token shared by every site except the ones renamed by a
/// [`Rule::TokenSubstitution`].
const ACQ_TOKEN: &str = "acq-sag";

/// Site whose run indices are recoverable only from existing lesion
/// annotation filenames (the large cohort).
pub const DYNAMIC_RUN_SITE: &str = "site_012";

/// Study participant identifier. The raw token is kept verbatim; a flattened
/// form (path separators replaced with `_`) is derived once for use as a
/// filename component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectId {
    raw: String,
    flat: String,
}

impl SubjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let flat = raw.replace(['/', '\\'], "_");
        Self { raw, flat }
    }

    /// Original token, possibly containing a session sub-path.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Flat-safe form used to build filenames.
    pub fn flat(&self) -> &str {
        &self.flat
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Data-collection site, derived from the data-root path. Read-only context
/// for rule selection; never stored in outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site(String);

impl Site {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract the `site_NNN` token from a data-root path, if present.
    pub fn from_path(path: &Path) -> Option<Self> {
        static SITE_RE: OnceLock<Regex> = OnceLock::new();
        let re =
            SITE_RE.get_or_init(|| Regex::new(r"site_\d{3}").expect("regex for site tokens"));
        re.find(&path.to_string_lossy())
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolved base filename (no extension) of the subject's canonical
/// T2w acquisition. Computed once per subject run and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionDescriptor(String);

impl AcquisitionDescriptor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename of the image itself.
    pub fn image_name(&self) -> String {
        format!("{}.nii.gz", self.0)
    }

    /// Filename of an annotation mask in the given category.
    pub fn annotation_name(&self, category: &str) -> String {
        format!("{}_{}.nii.gz", self.0, category)
    }
}

impl fmt::Display for AcquisitionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One naming exception. Base rules ([`Rule::ExplicitRun`],
/// [`Rule::DynamicRun`]) are evaluated in order and the first match wins;
/// [`Rule::TokenSubstitution`] is applied after the base descriptor is fixed,
/// independent of which branch produced it.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Subjects with a known duplicated acquisition: force this run index.
    ExplicitRun {
        subjects: &'static [&'static str],
        run: u8,
    },
    /// At this site, recover the run index from an existing lesion
    /// annotation filename. No annotation or no embedded token is a silent
    /// fallthrough to the default descriptor.
    DynamicRun { site: &'static str },
    /// Site-scoped spelling fix applied to the finished descriptor.
    TokenSubstitution {
        family: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

/// Ordered rule table. Construction fails loudly if two explicit-run rules
/// claim the same subject, since "first match wins" would otherwise hide a
/// misconfigured table.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Result<Self, PipelineError> {
        let mut seen: Vec<&str> = Vec::new();
        for rule in &rules {
            if let Rule::ExplicitRun { subjects, .. } = rule {
                for subject in *subjects {
                    if seen.contains(subject) {
                        return Err(PipelineError::Configuration(format!(
                            "subject {subject} appears in more than one run-override rule"
                        )));
                    }
                    seen.push(*subject);
                }
            }
        }
        Ok(Self { rules })
    }

    /// The production table: known run-index exceptions, the large-cohort
    /// dynamic rule, and the `sub-que` acquisition-token spelling.
    pub fn study_defaults() -> Result<Self, PipelineError> {
        Self::new(vec![
            Rule::ExplicitRun {
                subjects: &["sub-ott004", "sub-que002", "sub-que005", "sub-que008"],
                run: 1,
            },
            Rule::ExplicitRun {
                subjects: &["sub-que012"],
                run: 2,
            },
            Rule::ExplicitRun {
                subjects: &["sub-van010"],
                run: 3,
            },
            Rule::ExplicitRun {
                subjects: &["sub-que004"],
                run: 4,
            },
            Rule::DynamicRun {
                site: DYNAMIC_RUN_SITE,
            },
            Rule::TokenSubstitution {
                family: "sub-que",
                from: ACQ_TOKEN,
                to: "acq-sagittal",
            },
        ])
    }

    /// Resolve the canonical acquisition descriptor for one subject.
    ///
    /// Pure in the sense required for auditability: the result depends only
    /// on the inputs, the static table, and the directory listing of
    /// `labels_dir` (consulted by the dynamic rule alone). No randomness, no
    /// clock.
    pub fn resolve(
        &self,
        subject: &SubjectId,
        site: Option<&Site>,
        labels_dir: &Path,
    ) -> AcquisitionDescriptor {
        let flat = subject.flat();
        let mut base: Option<String> = None;

        for rule in &self.rules {
            if base.is_some() {
                break;
            }
            match rule {
                Rule::ExplicitRun { subjects, run } => {
                    if subjects.contains(&flat) {
                        base = Some(format!("{flat}_{ACQ_TOKEN}_run-{run:02}_T2w"));
                    }
                }
                Rule::DynamicRun { site: rule_site } => {
                    if !site.is_some_and(|s| s.as_str() == *rule_site) {
                        continue;
                    }
                    if let Some(run) = dynamic_run_token(flat, labels_dir) {
                        base = Some(format!("{flat}_{ACQ_TOKEN}_run-{run}_T2w"));
                    }
                }
                Rule::TokenSubstitution { .. } => {}
            }
        }

        let mut descriptor = base.unwrap_or_else(|| format!("{flat}_{ACQ_TOKEN}_T2w"));

        // Substitutions run last, whatever branch produced the base. The
        // `to` guard keeps them idempotent even when `from` is a prefix of
        // `to` (as with acq-sag / acq-sagittal).
        for rule in &self.rules {
            if let Rule::TokenSubstitution { family, from, to } = rule {
                if flat.starts_with(family)
                    && descriptor.contains(from)
                    && !descriptor.contains(to)
                {
                    descriptor = descriptor.replace(from, to);
                }
            }
        }

        AcquisitionDescriptor(descriptor)
    }
}

/// Scan the subject's annotation directory for a sagittal T2w lesion mask and
/// pull a two-digit run token out of its name. Returns `None` when the
/// directory, file, or token is absent; that is the rule's no-op fallthrough,
/// not an error.
fn dynamic_run_token(flat: &str, labels_dir: &Path) -> Option<String> {
    static RUN_RE: OnceLock<Regex> = OnceLock::new();
    let re = RUN_RE.get_or_init(|| Regex::new(r"run-(\d{2})").expect("regex for run tokens"));

    let prefix = format!("{flat}_{ACQ_TOKEN}");
    let mut names: Vec<String> = fs::read_dir(labels_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix) && name.contains("_T2w_lesion"))
        .collect();
    names.sort();

    names
        .iter()
        .find_map(|name| re.captures(name).map(|caps| caps[1].to_string()))
}
