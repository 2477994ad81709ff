//! Comparison configuration.
//!
//! A [`ComparisonConfig`] is built once per assertion (or loaded from JSON)
//! and passed by reference into the engine. Algorithm tuning lives in a
//! free-form numeric map that is shallow-merged over the defaults of the
//! selected algorithm, caller keys winning.

use crate::result::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Comparison algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonAlgorithm {
    /// Per-pixel YIQ color distance with anti-aliasing suppression
    #[serde(alias = "pixelmatch")]
    PixelDiff,
    /// Windowed structural similarity
    #[default]
    #[serde(alias = "ssim")]
    StructuralSimilarity,
}

impl ComparisonAlgorithm {
    /// Default tuning parameters for this algorithm
    #[must_use]
    pub fn default_parameters(self) -> BTreeMap<String, f64> {
        let pairs: &[(&str, f64)] = match self {
            Self::PixelDiff => &[("threshold", 0.01), ("alpha", 0.1), ("include_aa", 0.0)],
            Self::StructuralSimilarity => &[
                ("window_size", 11.0),
                ("sigma", 1.5),
                ("k1", 0.01),
                ("k2", 0.03),
                ("bit_depth", 8.0),
                ("downsample", 1.0),
            ],
        };
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    /// Stable name used in logs and messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PixelDiff => "pixel-diff",
            Self::StructuralSimilarity => "structural-similarity",
        }
    }
}

impl fmt::Display for ComparisonAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the failure threshold is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThresholdType {
    /// Threshold is a maximum number of differing pixels
    AbsoluteCount,
    /// Threshold is a maximum fraction of differing pixels
    #[default]
    Ratio,
    /// Any other name; always evaluates as a failure
    Unrecognized(String),
}

impl ThresholdType {
    /// Canonical name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AbsoluteCount => "absolute-count",
            Self::Ratio => "ratio",
            Self::Unrecognized(name) => name,
        }
    }
}

impl From<String> for ThresholdType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "absolute-count" | "pixel" => Self::AbsoluteCount,
            "ratio" | "percent" => Self::Ratio,
            _ => Self::Unrecognized(name),
        }
    }
}

impl From<ThresholdType> for String {
    fn from(kind: ThresholdType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline update policy supplied by the test runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotUpdateMode {
    /// Never write baselines
    None,
    /// Write baselines that do not exist yet
    #[default]
    Missing,
    /// Overwrite every baseline with the captured image
    All,
}

impl SnapshotUpdateMode {
    /// Whether an absent baseline may be created
    #[must_use]
    pub const fn writes_missing(self) -> bool {
        matches!(self, Self::Missing | Self::All)
    }
}

impl FromStr for SnapshotUpdateMode {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "missing" => Ok(Self::Missing),
            "all" => Ok(Self::All),
            other => Err(SnapshotError::InvalidConfig {
                message: format!("unknown update mode `{other}` (expected none, missing or all)"),
            }),
        }
    }
}

impl fmt::Display for SnapshotUpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Missing => "missing",
            Self::All => "all",
        })
    }
}

/// Configuration for a single image snapshot comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Algorithm used to compare the images
    pub algorithm: ComparisonAlgorithm,
    /// Caller tuning parameters, merged over the algorithm defaults
    pub parameters: BTreeMap<String, f64>,
    /// Gaussian blur radius applied to both images before comparing
    pub blur: Option<f64>,
    /// Maximum tolerated difference
    pub failure_threshold: f64,
    /// Unit of `failure_threshold`
    pub failure_threshold_type: ThresholdType,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            algorithm: ComparisonAlgorithm::StructuralSimilarity,
            parameters: BTreeMap::new(),
            blur: None,
            failure_threshold: 0.02,
            failure_threshold_type: ThresholdType::Ratio,
        }
    }
}

impl ComparisonConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the algorithm
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: ComparisonAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set one tuning parameter
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Set the pre-comparison blur radius
    #[must_use]
    pub fn with_blur(mut self, radius: f64) -> Self {
        self.blur = Some(radius);
        self
    }

    /// Set the failure threshold and its unit
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: f64, kind: ThresholdType) -> Self {
        self.failure_threshold = threshold;
        self.failure_threshold_type = kind;
        self
    }

    /// Algorithm defaults overlaid with the caller's parameters
    #[must_use]
    pub fn resolved_parameters(&self) -> BTreeMap<String, f64> {
        let mut merged = self.algorithm.default_parameters();
        merged.extend(self.parameters.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }

    /// Blur radius if blurring is enabled
    #[must_use]
    pub fn blur_radius(&self) -> Option<f64> {
        self.blur.filter(|r| *r > 0.0)
    }

    /// Check the numeric fields that do not depend on the algorithm
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidConfig`] for negative or non-finite values
    pub fn validate(&self) -> SnapshotResult<()> {
        if !self.failure_threshold.is_finite() || self.failure_threshold < 0.0 {
            return Err(SnapshotError::InvalidConfig {
                message: format!(
                    "failure threshold must be a non-negative number, got {}",
                    self.failure_threshold
                ),
            });
        }
        if let Some(radius) = self.blur {
            if !radius.is_finite() || radius < 0.0 {
                return Err(SnapshotError::InvalidConfig {
                    message: format!("blur radius must be a non-negative number, got {radius}"),
                });
            }
        }
        Ok(())
    }

    /// Parse a configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns error on malformed JSON or invalid values
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_json_file(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_json(&json)
    }
}

/// Read a numeric parameter, rejecting values outside `[min, max]`
pub(crate) fn parameter_in_range(
    params: &BTreeMap<String, f64>,
    key: &str,
    min: f64,
    max: f64,
) -> SnapshotResult<f64> {
    let value = params.get(key).copied().unwrap_or(f64::NAN);
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(SnapshotError::InvalidConfig {
            message: format!("`{key}` must be within [{min}, {max}], got {value}"),
        })
    }
}

/// Warn about parameters no comparator reads
pub(crate) fn warn_unknown_parameters(
    algorithm: ComparisonAlgorithm,
    params: &BTreeMap<String, f64>,
) {
    let known = algorithm.default_parameters();
    for key in params.keys().filter(|k| !known.contains_key(*k)) {
        tracing::warn!(%algorithm, key = %key, "ignoring unknown comparison parameter");
    }
}
