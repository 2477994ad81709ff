//! Comparison outcome records.

use crate::artifacts::ArtifactPaths;
use crate::pixel_buffer::PixelBuffer;
use serde::Serialize;
use std::path::PathBuf;

/// Content type used when an artifact's format is unknown
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Which path through the engine produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    /// Baseline was missing and has been written from the capture
    BaselineWritten,
    /// Baseline was missing; a negated assertion declined to write it
    BaselineSkipped,
    /// Images matched within the threshold
    Matched,
    /// Images differed and the assertion was negated
    MismatchExpected,
    /// Update mode `all` replaced the baseline with the capture
    BaselineUpdated,
    /// Images differed beyond the threshold
    Mismatched,
    /// Images matched but the assertion was negated
    UnexpectedMatch,
    /// Images matched under a negated assertion; update mode `all` still
    /// replaced the baseline
    UnexpectedMatchUpdated,
}

impl OutcomeKind {
    /// Whether the assertion is satisfied
    #[must_use]
    pub const fn passed(self) -> bool {
        !matches!(
            self,
            Self::Mismatched | Self::UnexpectedMatch | Self::UnexpectedMatchUpdated
        )
    }
}

/// Artifacts written for a failed comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffArtifacts {
    /// Copy of the baseline
    pub expected_path: PathBuf,
    /// Copy of the captured image
    pub actual_path: PathBuf,
    /// Rendered diff
    pub diff_path: PathBuf,
    /// Content type of the three files
    pub mime_type: Option<String>,
}

impl DiffArtifacts {
    /// Attach a MIME type to a set of paths
    #[must_use]
    pub fn new(paths: ArtifactPaths, mime_type: Option<&str>) -> Self {
        Self {
            expected_path: paths.expected,
            actual_path: paths.actual,
            diff_path: paths.diff,
            mime_type: mime_type.map(str::to_string),
        }
    }

    /// Content type for report attachments
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// A file to attach to a test report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// `diff`, `expected` or `actual`
    pub name: &'static str,
    /// MIME type
    pub content_type: String,
    /// File location
    pub path: PathBuf,
}

/// Result of one snapshot assertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    /// Whether the assertion is satisfied (negation already applied)
    pub passed: bool,
    /// Engine path taken
    pub kind: OutcomeKind,
    /// Human-readable summary
    pub message: String,
    /// `diff_pixel_count / total_pixels`
    pub diff_ratio: f64,
    /// Differing pixels reported by the comparator
    pub diff_pixel_count: u32,
    /// Rendered diff; present whenever a comparison ran
    #[serde(skip)]
    pub diff_image: Option<PixelBuffer>,
    /// Files written on a genuine failure
    pub artifacts: Option<DiffArtifacts>,
}

impl ComparisonOutcome {
    /// Outcome of a path that did not compare any pixels
    pub(crate) fn without_comparison(kind: OutcomeKind, message: String) -> Self {
        Self {
            passed: kind.passed(),
            kind,
            message,
            diff_ratio: 0.0,
            diff_pixel_count: 0,
            diff_image: None,
            artifacts: None,
        }
    }

    /// Report attachments in `diff`, `expected`, `actual` order
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        let Some(artifacts) = &self.artifacts else {
            return Vec::new();
        };
        let content_type = artifacts.content_type().to_string();
        [
            ("diff", &artifacts.diff_path),
            ("expected", &artifacts.expected_path),
            ("actual", &artifacts.actual_path),
        ]
        .into_iter()
        .map(|(name, path)| Attachment {
            name,
            content_type: content_type.clone(),
            path: path.clone(),
        })
        .collect()
    }

    /// Serialize the outcome (without the diff image) as JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> crate::SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::Path;

    fn failed(mime: Option<&str>) -> ComparisonOutcome {
        ComparisonOutcome {
            passed: false,
            kind: OutcomeKind::Mismatched,
            message: "Snapshot comparison failed".to_string(),
            diff_ratio: 0.5,
            diff_pixel_count: 2,
            diff_image: None,
            artifacts: Some(DiffArtifacts::new(
                ArtifactPaths::for_output(Path::new("out/x.png"), false),
                mime,
            )),
        }
    }

    #[test]
    fn test_kind_pass_mapping() {
        assert!(OutcomeKind::BaselineWritten.passed());
        assert!(OutcomeKind::BaselineSkipped.passed());
        assert!(OutcomeKind::MismatchExpected.passed());
        assert!(OutcomeKind::BaselineUpdated.passed());
        assert!(!OutcomeKind::Mismatched.passed());
        assert!(!OutcomeKind::UnexpectedMatch.passed());
        assert!(!OutcomeKind::UnexpectedMatchUpdated.passed());
    }

    #[test]
    fn test_attachments_order_and_type() {
        let attachments = failed(Some("image/png")).attachments();
        let names: Vec<_> = attachments.iter().map(|a| a.name).collect();
        assert_eq!(names, ["diff", "expected", "actual"]);
        assert!(attachments.iter().all(|a| a.content_type == "image/png"));
        assert_eq!(attachments[0].path, PathBuf::from("out/x-diff.png"));
    }

    #[test]
    fn test_attachment_type_defaults_to_binary() {
        let attachments = failed(None).attachments();
        assert!(attachments.iter().all(|a| a.content_type == DEFAULT_MIME_TYPE));
    }

    #[test]
    fn test_no_artifacts_no_attachments() {
        let outcome = ComparisonOutcome::without_comparison(
            OutcomeKind::BaselineWritten,
            "written".to_string(),
        );
        assert!(outcome.passed);
        assert!(outcome.attachments().is_empty());
    }

    #[test]
    fn test_to_json() {
        let json = failed(Some("image/png")).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "mismatched");
        assert_eq!(value["passed"], false);
        assert!(value.get("diff_image").is_none());
        assert_eq!(value["artifacts"]["mime_type"], "image/png");
    }
}
