use serde::Serialize;

use crate::types::STAT_DECIMALS;

/// Summary statistics for the valid values of one numeric variable in one group.
///
/// All fields except `n` are rounded to [`STAT_DECIMALS`] digits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub n: usize,
    pub mean: f64,
    /// Population standard deviation (divides by `n`)
    pub sd: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericSummary {
    /// Summarise a set of valid values. Returns `None` for an empty set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        Some(Self {
            n,
            mean: round_to(mean, STAT_DECIMALS),
            sd: round_to(variance.sqrt(), STAT_DECIMALS),
            median: round_to(quantile(&sorted, 0.5)?, STAT_DECIMALS),
            q1: round_to(quantile(&sorted, 0.25)?, STAT_DECIMALS),
            q3: round_to(quantile(&sorted, 0.75)?, STAT_DECIMALS),
            min: round_to(sorted[0], STAT_DECIMALS),
            max: round_to(sorted[n - 1], STAT_DECIMALS),
        })
    }
}

/// Quantile of ascending-sorted values by linear interpolation at index `p * (n - 1)`
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let idx = p * (n - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64))
}

/// Round to a number of decimal digits using the exact decimal expansion of `value`
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value)
        .parse::<f64>()
        .unwrap_or(value)
}
