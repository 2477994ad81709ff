//! Snapshot comparison engine.
//!
//! Every call walks the same small state machine:
//!
//! ```text
//! ResolvingBaseline ──► BootstrapDone
//!        │
//!        ▼
//!    Comparing ──► Passed | Failed
//! ```
//!
//! The branching at each edge is kept in the pure functions
//! [`resolve_baseline`] and [`resolve_verdict`] so the bootstrap, negation and
//! force-update interactions can be tested without a filesystem.

use crate::artifacts::ArtifactWriter;
use crate::blur::blur_pair;
use crate::codec::{ImageCodec, PngCodec};
use crate::comparator::{comparator_for, Comparator, Comparison};
use crate::config::{ComparisonConfig, SnapshotUpdateMode};
use crate::outcome::{ComparisonOutcome, DiffArtifacts, OutcomeKind};
use crate::pixel_buffer::PixelBuffer;
use crate::result::{SnapshotError, SnapshotResult};
use crate::store::{SnapshotName, SnapshotStore};
use crate::threshold::{evaluate, ThresholdVerdict};
use std::path::{Path, PathBuf};

/// Named engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Deciding between bootstrap and comparison
    ResolvingBaseline,
    /// Missing baseline handled without comparing
    BootstrapDone,
    /// Running the comparator
    Comparing,
    /// Assertion satisfied
    Passed,
    /// Assertion not satisfied
    Failed,
}

impl EngineState {
    /// Whether no further transition follows
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::BootstrapDone | Self::Passed | Self::Failed)
    }
}

/// What to do once baseline existence is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineDecision {
    /// Baseline exists; compare against it
    Compare,
    /// Write the capture as the new baseline and pass
    WriteBaseline,
    /// Pass without writing; negated assertions never create baselines
    SkipBaseline,
    /// Fail with [`SnapshotError::MissingSnapshot`]
    Missing,
}

/// Decide the bootstrap path for a snapshot
#[must_use]
pub const fn resolve_baseline(
    exists: bool,
    update_mode: SnapshotUpdateMode,
    negated: bool,
) -> BaselineDecision {
    if exists {
        BaselineDecision::Compare
    } else if !update_mode.writes_missing() {
        BaselineDecision::Missing
    } else if negated {
        BaselineDecision::SkipBaseline
    } else {
        BaselineDecision::WriteBaseline
    }
}

/// Outcome of a comparison that ran, before messages and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Images matched within the threshold
    Matched,
    /// Images differed beyond the threshold
    Mismatched,
    /// Images differed and the assertion was negated
    MismatchExpected,
    /// Images matched but the assertion was negated
    UnexpectedMatch,
    /// Update mode `all` replaces the baseline with the capture
    BaselineUpdated {
        /// The assertion expected the images to differ
        negated: bool,
    },
}

impl Verdict {
    /// Outcome kind reported for this verdict
    #[must_use]
    pub const fn kind(self) -> OutcomeKind {
        match self {
            Self::Matched => OutcomeKind::Matched,
            Self::Mismatched => OutcomeKind::Mismatched,
            Self::MismatchExpected => OutcomeKind::MismatchExpected,
            Self::UnexpectedMatch => OutcomeKind::UnexpectedMatch,
            Self::BaselineUpdated { negated: false } => OutcomeKind::BaselineUpdated,
            Self::BaselineUpdated { negated: true } => OutcomeKind::UnexpectedMatchUpdated,
        }
    }
}

/// Combine the raw threshold result with negation and update mode
///
/// A negated assertion that saw a mismatch is satisfied and leaves the
/// baseline alone. Every other comparison under update mode `all`
/// force-accepts the capture; a negated match still fails.
#[must_use]
pub const fn resolve_verdict(
    raw_passed: bool,
    negated: bool,
    update_mode: SnapshotUpdateMode,
) -> Verdict {
    match (negated, raw_passed, update_mode) {
        (true, false, _) => Verdict::MismatchExpected,
        (_, _, SnapshotUpdateMode::All) => Verdict::BaselineUpdated { negated },
        (true, true, _) => Verdict::UnexpectedMatch,
        (false, true, _) => Verdict::Matched,
        (false, false, _) => Verdict::Mismatched,
    }
}

/// Per-call inputs that are not part of the engine's roots
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Algorithm and threshold configuration
    pub config: ComparisonConfig,
    /// Baseline update policy from the test runner
    pub update_mode: SnapshotUpdateMode,
    /// The assertion expects the images to differ
    pub negated: bool,
}

impl CompareOptions {
    /// Options with the given config, update mode `missing`, not negated
    #[must_use]
    pub fn new(config: ComparisonConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the update mode
    #[must_use]
    pub const fn with_update_mode(mut self, update_mode: SnapshotUpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    /// Set negation
    #[must_use]
    pub const fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }
}

/// Compares captured images against stored baselines
///
/// The engine holds only immutable roots and a codec, so one instance may be
/// shared across threads as long as concurrent calls use distinct names.
#[derive(Debug, Clone)]
pub struct ComparisonEngine<C = PngCodec> {
    store: SnapshotStore,
    artifacts: ArtifactWriter,
    codec: C,
}

impl ComparisonEngine<PngCodec> {
    /// Create an engine reading baselines from `snapshot_root` and writing
    /// failure artifacts under `output_root`
    #[must_use]
    pub fn new(snapshot_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            store: SnapshotStore::new(snapshot_root),
            artifacts: ArtifactWriter::new(output_root),
            codec: PngCodec,
        }
    }
}

impl<C: ImageCodec> ComparisonEngine<C> {
    /// Swap the image codec
    #[must_use]
    pub fn with_codec<D: ImageCodec>(self, codec: D) -> ComparisonEngine<D> {
        ComparisonEngine {
            store: self.store,
            artifacts: self.artifacts,
            codec,
        }
    }

    /// Sanitize artifact file names
    #[must_use]
    pub fn with_sanitized_artifacts(mut self, sanitize: bool) -> Self {
        self.artifacts = self.artifacts.with_sanitize(sanitize);
        self
    }

    /// Baseline store
    #[must_use]
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Artifact writer
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactWriter {
        &self.artifacts
    }

    /// Assert that `captured` matches the baseline stored under `name`
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::MissingSnapshot`], [`SnapshotError::Decode`],
    /// [`SnapshotError::DimensionMismatch`], [`SnapshotError::InvalidConfig`],
    /// or filesystem errors from writing baselines and artifacts
    pub fn compare(
        &self,
        captured: &[u8],
        name: &SnapshotName,
        options: &CompareOptions,
    ) -> SnapshotResult<ComparisonOutcome> {
        let config = &options.config;
        config.validate()?;
        let comparator = comparator_for(config)?;
        let test = self
            .codec
            .decode(captured)
            .map_err(|e| e.with_decode_context("captured image"))?;

        let snapshot_path = self.store.path(name);
        trace_state(EngineState::ResolvingBaseline, name);
        let decision = resolve_baseline(self.store.exists(name), options.update_mode, options.negated);
        match decision {
            BaselineDecision::Missing => {
                return Err(SnapshotError::MissingSnapshot {
                    path: snapshot_path,
                })
            }
            BaselineDecision::SkipBaseline => {
                tracing::warn!(
                    path = %snapshot_path.display(),
                    "baseline missing, negated assertion will not write it"
                );
                trace_state(EngineState::BootstrapDone, name);
                return Ok(ComparisonOutcome::without_comparison(
                    OutcomeKind::BaselineSkipped,
                    format!(
                        "{} is missing in snapshots, negated matchers won't write them automatically.",
                        snapshot_path.display()
                    ),
                ));
            }
            BaselineDecision::WriteBaseline => {
                self.store.write_bytes(name, captured)?;
                tracing::info!(path = %snapshot_path.display(), "wrote missing baseline");
                trace_state(EngineState::BootstrapDone, name);
                return Ok(ComparisonOutcome::without_comparison(
                    OutcomeKind::BaselineWritten,
                    format!(
                        "{} is missing in snapshots, writing actual.",
                        snapshot_path.display()
                    ),
                ));
            }
            BaselineDecision::Compare => {}
        }

        trace_state(EngineState::Comparing, name);
        self.artifacts.clear(name)?;
        let reference_bytes = self.store.read_bytes(name)?;
        let reference = self
            .codec
            .decode(&reference_bytes)
            .map_err(|e| e.with_decode_context(&snapshot_path.display().to_string()))?;

        let (comparison, threshold) =
            compare_buffers(&test, &reference, config, comparator.as_ref())?;
        let verdict = resolve_verdict(threshold.passed, options.negated, options.update_mode);
        let ratio = threshold.diff_ratio;

        let (message, artifacts) = match verdict {
            Verdict::Matched => (format!("Comparison passed with diff ratio {ratio}"), None),
            Verdict::MismatchExpected => (
                format!("Images differ as expected with diff ratio {ratio}"),
                None,
            ),
            Verdict::UnexpectedMatch => (
                format!(
                    "Expected {} not to match, but comparison passed with diff ratio {ratio}",
                    snapshot_path.display()
                ),
                None,
            ),
            Verdict::BaselineUpdated { negated } => {
                self.store.write_bytes(name, captured)?;
                tracing::info!(
                    path = %snapshot_path.display(),
                    diff_ratio = ratio,
                    negated,
                    "update mode all, overwrote baseline"
                );
                let message = if negated {
                    format!(
                        "Expected {} not to match, but comparison passed with diff ratio {ratio}; update mode all, wrote actual.",
                        snapshot_path.display()
                    )
                } else {
                    format!(
                        "{} running with update mode all, writing actual.",
                        snapshot_path.display()
                    )
                };
                (message, None)
            }
            Verdict::Mismatched => {
                let diff_bytes = self.codec.encode(&comparison.diff_image)?;
                let paths = self
                    .artifacts
                    .write(name, &reference_bytes, captured, &diff_bytes)?;
                let message = failure_message(&paths.expected, &paths.actual, &paths.diff, ratio);
                (
                    message,
                    Some(DiffArtifacts::new(paths, Some(self.codec.mime_type()))),
                )
            }
        };

        let kind = verdict.kind();
        let passed = kind.passed();
        trace_state(
            if passed {
                EngineState::Passed
            } else {
                EngineState::Failed
            },
            name,
        );
        Ok(ComparisonOutcome {
            passed,
            kind,
            message,
            diff_ratio: ratio,
            diff_pixel_count: comparison.diff_pixel_count,
            diff_image: Some(comparison.diff_image),
            artifacts,
        })
    }
}

/// Blur (if configured), compare and evaluate two decoded images
///
/// # Errors
///
/// Returns [`SnapshotError::DimensionMismatch`] when sizes differ
pub fn compare_buffers(
    test: &PixelBuffer,
    reference: &PixelBuffer,
    config: &ComparisonConfig,
    comparator: &dyn Comparator,
) -> SnapshotResult<(Comparison, ThresholdVerdict)> {
    reference.ensure_same_dimensions(test)?;

    let comparison = match config.blur_radius() {
        Some(radius) => {
            let (test, reference) = blur_pair(test, reference, radius)?;
            comparator.compare(&test, &reference)?
        }
        None => comparator.compare(test, reference)?,
    };

    let verdict = evaluate(
        comparison.diff_pixel_count,
        test.total_pixels(),
        &config.failure_threshold_type,
        config.failure_threshold,
    );
    tracing::debug!(
        algorithm = %comparator.algorithm(),
        diff_pixel_count = comparison.diff_pixel_count,
        diff_ratio = verdict.diff_ratio,
        passed = verdict.passed,
        "compared images"
    );
    Ok((comparison, verdict))
}

fn failure_message(expected: &Path, actual: &Path, diff: &Path, ratio: f64) -> String {
    [
        "Snapshot comparison failed:".to_string(),
        format!("Expected: {}", expected.display()),
        format!("Received: {}", actual.display()),
        format!("    Diff: {}", diff.display()),
        format!("Diff ratio: {ratio}"),
    ]
    .join("\n")
}

fn trace_state(state: EngineState, name: &SnapshotName) {
    tracing::trace!(?state, terminal = state.is_terminal(), snapshot = %name, "engine state");
}
