//! Threshold evaluation.

use crate::config::ThresholdType;

/// Outcome of [`evaluate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdVerdict {
    /// `diff_pixel_count / total_pixels` (0.0 for empty images)
    pub diff_ratio: f64,
    /// Whether the difference is tolerated
    pub passed: bool,
}

/// Decide whether a difference count passes the configured threshold
///
/// The ratio is always computed for reporting. Unrecognized threshold types
/// fail closed.
#[must_use]
pub fn evaluate(
    diff_pixel_count: u32,
    total_pixels: u64,
    threshold_type: &ThresholdType,
    threshold: f64,
) -> ThresholdVerdict {
    let diff_ratio = if total_pixels == 0 {
        0.0
    } else {
        f64::from(diff_pixel_count) / total_pixels as f64
    };

    let passed = match threshold_type {
        ThresholdType::AbsoluteCount => f64::from(diff_pixel_count) <= threshold,
        ThresholdType::Ratio => diff_ratio <= threshold,
        ThresholdType::Unrecognized(name) => {
            tracing::warn!(threshold_type = %name, "unrecognized threshold type, failing comparison");
            false
        }
    };

    ThresholdVerdict { diff_ratio, passed }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ratio_boundary() {
        let verdict = evaluate(5, 100, &ThresholdType::Ratio, 0.05);
        assert!(verdict.passed);
        assert!((verdict.diff_ratio - 0.05).abs() < f64::EPSILON);

        assert!(!evaluate(6, 100, &ThresholdType::Ratio, 0.05).passed);
    }

    #[test]
    fn test_absolute_count_boundary() {
        let verdict = evaluate(5, 100, &ThresholdType::AbsoluteCount, 5.0);
        assert!(verdict.passed);
        assert!((verdict.diff_ratio - 0.05).abs() < f64::EPSILON);

        assert!(!evaluate(6, 100, &ThresholdType::AbsoluteCount, 5.0).passed);
    }

    #[test]
    fn test_unrecognized_type_fails_closed() {
        let kind = ThresholdType::Unrecognized("furlongs".to_string());
        let verdict = evaluate(0, 100, &kind, 1_000.0);
        assert!(!verdict.passed);
        assert_eq!(verdict.diff_ratio, 0.0);
    }

    #[test]
    fn test_empty_image() {
        let verdict = evaluate(0, 0, &ThresholdType::Ratio, 0.0);
        assert!(verdict.passed);
        assert_eq!(verdict.diff_ratio, 0.0);
    }

    proptest! {
        #[test]
        fn prop_zero_diff_always_passes(total in 1u64..10_000_000, threshold in 0.0f64..1e6) {
            prop_assert!(evaluate(0, total, &ThresholdType::Ratio, threshold).passed);
            prop_assert!(evaluate(0, total, &ThresholdType::AbsoluteCount, threshold).passed);
        }

        #[test]
        fn prop_ratio_within_unit_interval(count in 0u32..10_000, extra in 0u64..10_000) {
            let total = u64::from(count) + extra + 1;
            let verdict = evaluate(count, total, &ThresholdType::Ratio, 0.5);
            prop_assert!((0.0..=1.0).contains(&verdict.diff_ratio));
        }
    }
}
