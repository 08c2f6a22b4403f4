//! Summary statistics over grouped samples.
//!
//! Standard deviation is the population form, `sqrt(Σ(x - μ)² / n)`, so that
//! summaries match those of the plotting tooling downstream.

use serde::Serialize;

/// Calculates the arithmetic mean of a slice of values
///
/// Returns `None` if the slice is empty.
///
/// # Example
///
/// ```rust
/// use aggregate::stats::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
/// assert_eq!(mean(&[]), None);
/// ```
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Calculates the population standard deviation of a slice of values
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Count, mean and population standard deviation of one group.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
}

impl Summary {
    /// Summarizes `values`; `None` for an empty group.
    #[must_use]
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            stddev: std_dev(values)?,
        })
    }
}

/// Ratio that is absent when the denominator is zero or not finite.
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let value = numerator / denominator;
    (denominator != 0.0 && value.is_finite()).then_some(value)
}

/// Comparison of the modified variant against the other two at one grid point.
///
/// Every field is absent when a group it depends on is empty or the ratio is
/// undefined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Comparison {
    /// `mean_modified / mean_baseline - 1`
    pub relative_to_baseline: Option<f64>,
    /// `(mean_modified - mean_baseline) / stddev_baseline`
    pub deviations_baseline: Option<f64>,
    /// `(mean_modified - mean_baseline) / stddev_modified`
    pub deviations_modified: Option<f64>,
    /// `mean_modified / mean_reference - 1`
    pub relative_to_reference: Option<f64>,
}

impl Comparison {
    #[must_use]
    pub fn new(
        baseline: Option<Summary>,
        modified: Option<Summary>,
        reference: Option<Summary>,
    ) -> Self {
        let Some(modified) = modified else {
            return Self::default();
        };

        let mut comparison = Self::default();
        if let Some(baseline) = baseline {
            let delta = modified.mean - baseline.mean;
            comparison.relative_to_baseline = ratio(modified.mean, baseline.mean).map(|r| r - 1.0);
            comparison.deviations_baseline = ratio(delta, baseline.stddev);
            comparison.deviations_modified = ratio(delta, modified.stddev);
        }
        if let Some(reference) = reference {
            comparison.relative_to_reference =
                ratio(modified.mean, reference.mean).map(|r| r - 1.0);
        }
        comparison
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Formats an optional statistic for logs.
#[must_use]
pub fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}
