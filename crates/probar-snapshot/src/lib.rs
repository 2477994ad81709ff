//! Probar image snapshots: visual regression comparison against stored baselines.
//!
//! A captured image is compared with a baseline under a configurable policy.
//! Two comparators are available (per-pixel YIQ distance and windowed SSIM);
//! a threshold evaluator turns their difference count into pass/fail, and on
//! failure the engine archives expected, actual and diff images.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    ComparisonEngine::compare                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────┐   ┌────────────┐   ┌──────────┐  │
//! │  │ Snapshot    │──►│ Blur     │──►│ Comparator │──►│Threshold │  │
//! │  │ Store       │   │ (opt.)   │   │ pixel/SSIM │   │ evaluate │  │
//! │  └─────────────┘   └──────────┘   └────────────┘   └────┬─────┘  │
//! │         ▲ bootstrap / force update                      │        │
//! │         └───────────────────────────────┐               ▼        │
//! │                                    ┌─────────────────────────┐   │
//! │                                    │ ArtifactWriter          │   │
//! │                                    │ -expected -actual -diff │   │
//! │                                    └─────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use probar_snapshot::{
//!     CompareOptions, ComparisonAlgorithm, ComparisonConfig, ComparisonEngine, SnapshotName,
//!     SnapshotUpdateMode,
//! };
//!
//! # fn main() -> probar_snapshot::SnapshotResult<()> {
//! let engine = ComparisonEngine::new("__snapshots__", "test-results");
//! let options = CompareOptions::new(
//!     ComparisonConfig::new().with_algorithm(ComparisonAlgorithm::PixelDiff),
//! )
//! .with_update_mode(SnapshotUpdateMode::Missing);
//!
//! let screenshot = std::fs::read("screenshot.png").unwrap_or_default();
//! let outcome = engine.compare(&screenshot, &SnapshotName::from("home.png"), &options)?;
//! assert!(outcome.passed, "{}", outcome.message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod artifacts;
mod blur;
mod codec;
mod comparator;
mod config;
mod engine;
mod outcome;
mod pixel_buffer;
mod result;
mod store;
mod threshold;

pub use artifacts::{
    add_suffix_to_file_path, sanitize_for_file_path, ArtifactPaths, ArtifactWriter,
    ACTUAL_SUFFIX, DIFF_SUFFIX, EXPECTED_SUFFIX,
};
pub use blur::{blur_pair, gaussian_blur};
pub use codec::{ImageCodec, PngCodec};
pub use comparator::{
    comparator_for, diff_count_from_mssim, Comparator, Comparison, PixelDiff, PixelDiffOptions,
    SsimMap, SsimOptions, StructuralSimilarity,
};
pub use config::{ComparisonAlgorithm, ComparisonConfig, SnapshotUpdateMode, ThresholdType};
pub use engine::{
    compare_buffers, resolve_baseline, resolve_verdict, BaselineDecision, CompareOptions,
    ComparisonEngine, EngineState, Verdict,
};
pub use outcome::{Attachment, ComparisonOutcome, DiffArtifacts, OutcomeKind, DEFAULT_MIME_TYPE};
pub use pixel_buffer::PixelBuffer;
pub use result::{SnapshotError, SnapshotResult};
pub use store::{SnapshotName, SnapshotStore};
pub use threshold::{evaluate, ThresholdVerdict};
