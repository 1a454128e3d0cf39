use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::privacy::MinCellPolicy;
use crate::stats::round_to;
use crate::types::canonical_number;

/// Integer variables spanning at most this range get one bin per integer
pub const NARROW_INTEGER_RANGE: f64 = 50.0;

/// A labelled histogram bin. `count` is `None` when suppressed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub label: String,
    pub count: Option<u64>,
}

/// Ordered histogram bins, serialized as parallel `labels` / `counts` arrays
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn labels(&self) -> Vec<&str> {
        self.bins.iter().map(|b| b.label.as_str()).collect()
    }

    pub fn counts(&self) -> Vec<Option<u64>> {
        self.bins.iter().map(|b| b.count).collect()
    }

    /// Sum of the counts that survived suppression
    #[cfg(test)]
    pub fn published_total(&self) -> u64 {
        self.bins.iter().filter_map(|b| b.count).sum()
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Histogram", 2)?;
        state.serialize_field("labels", &self.labels())?;
        state.serialize_field("counts", &self.counts())?;
        state.end()
    }
}

/// Bin valid values with the type-aware policy, then suppress small bins.
///
/// Branches, in priority order: degenerate range, narrow integer range,
/// wide integer range, continuous.
pub fn build_histogram(
    values: &[f64],
    is_integer: bool,
    target_bins: usize,
    policy: MinCellPolicy,
) -> Histogram {
    if values.is_empty() {
        return Histogram::default();
    }

    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo;
    let target_bins = target_bins.max(1);

    let raw = if range == 0.0 {
        vec![(canonical_number(round_to(lo, 2)), values.len() as u64)]
    } else if is_integer && range <= NARROW_INTEGER_RANGE {
        narrow_integer_bins(values, lo, hi)
    } else if is_integer {
        wide_integer_bins(values, lo, hi, target_bins)
    } else {
        continuous_bins(values, lo, hi, target_bins)
    };

    Histogram {
        bins: raw
            .into_iter()
            .map(|(label, count)| HistogramBin {
                label,
                count: policy.publish(count),
            })
            .collect(),
    }
}

fn narrow_integer_bins(values: &[f64], lo: f64, hi: f64) -> Vec<(String, u64)> {
    let lo_i = lo.round_ties_even() as i64;
    let hi_i = hi.round_ties_even() as i64;
    let mut bins: Vec<(String, u64)> = (lo_i..=hi_i).map(|v| (v.to_string(), 0)).collect();

    for v in values {
        let idx = v.round_ties_even() as i64 - lo_i;
        if idx >= 0 && (idx as usize) < bins.len() {
            bins[idx as usize].1 += 1;
        }
    }
    bins
}

fn wide_integer_bins(values: &[f64], lo: f64, hi: f64, target_bins: usize) -> Vec<(String, u64)> {
    let range = hi - lo;
    let step = (range / target_bins as f64).ceil().max(1.0);
    let n_bins = ((range + 1.0) / step).ceil() as usize;

    let mut bins: Vec<(String, u64)> = (0..n_bins)
        .map(|i| {
            let bin_lo = lo + i as f64 * step;
            let bin_hi = (bin_lo + step - 1.0).min(hi);
            let label = if step == 1.0 {
                format!("{}", bin_lo.round_ties_even() as i64)
            } else {
                format!(
                    "{}–{}",
                    bin_lo.round_ties_even() as i64,
                    bin_hi.round_ties_even() as i64
                )
            };
            (label, 0)
        })
        .collect();

    for v in values {
        let idx = (((v - lo) / step) as usize).min(n_bins - 1);
        bins[idx].1 += 1;
    }
    bins
}

fn continuous_bins(values: &[f64], lo: f64, hi: f64, target_bins: usize) -> Vec<(String, u64)> {
    let step = (hi - lo) / target_bins as f64;

    let mut bins: Vec<(String, u64)> = (0..target_bins)
        .map(|i| (format!("{:.2}", lo + i as f64 * step), 0))
        .collect();

    for v in values {
        let idx = (((v - lo) / step) as usize).min(target_bins - 1);
        bins[idx].1 += 1;
    }

    // Trailing empty bins only; gaps in the middle stay
    while bins.last().is_some_and(|(_, c)| *c == 0) {
        bins.pop();
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn open() -> MinCellPolicy {
        MinCellPolicy::new(0)
    }

    #[test]
    fn test_empty_values() {
        let hist = build_histogram(&[], false, 30, open());
        assert!(hist.bins.is_empty());
        let json = serde_json::to_string(&hist).unwrap();
        assert_eq!(json, r#"{"labels":[],"counts":[]}"#);
    }

    #[test]
    fn test_degenerate_range() {
        let values = vec![7.0; 10];
        let hist = build_histogram(&values, true, 30, MinCellPolicy::new(5));
        assert_eq!(hist.labels(), vec!["7"]);
        assert_eq!(hist.counts(), vec![Some(10)]);
    }

    #[test]
    fn test_degenerate_range_suppressed() {
        let values = vec![7.0; 3];
        let hist = build_histogram(&values, false, 30, MinCellPolicy::new(5));
        assert_eq!(hist.labels(), vec!["7"]);
        assert_eq!(hist.counts(), vec![None]);
    }

    #[test]
    fn test_narrow_integer_range() {
        let hist = build_histogram(&[1.0, 1.0, 2.0, 5.0], true, 30, open());
        assert_eq!(hist.labels(), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(
            hist.counts(),
            vec![Some(2), Some(1), Some(0), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_narrow_integer_range_suppression_keeps_labels() {
        let mut values = vec![1.0; 6];
        values.extend([2.0, 3.0]);
        let hist = build_histogram(&values, true, 30, MinCellPolicy::new(5));
        assert_eq!(hist.labels(), vec!["1", "2", "3"]);
        assert_eq!(hist.counts(), vec![Some(6), None, None]);
    }

    #[test]
    fn test_wide_integer_range() {
        let values: Vec<f64> = (0..100).map(|v| v as f64).collect();
        let hist = build_histogram(&values, true, 30, open());
        // range 99, step ceil(99 / 30) = 4, ceil(100 / 4) = 25 bins
        assert_eq!(hist.bins.len(), 25);
        assert_eq!(hist.bins[0].label, "0–3");
        assert_eq!(hist.bins[24].label, "96–99");
        assert!(hist.counts().iter().all(|c| *c == Some(4)));
    }

    #[test]
    fn test_wide_integer_range_unit_step() {
        let values: Vec<f64> = (0..=60).map(|v| v as f64).collect();
        let hist = build_histogram(&values, true, 100, open());
        assert_eq!(hist.bins.len(), 61);
        assert_eq!(hist.bins[60].label, "60");
    }

    #[test]
    fn test_continuous_bins() {
        let hist = build_histogram(&[0.0, 0.5, 1.0], false, 4, open());
        assert_eq!(hist.labels(), vec!["0.00", "0.25", "0.50", "0.75"]);
        assert_eq!(hist.counts(), vec![Some(1), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_continuous_bins_label_precision() {
        let hist = build_histogram(&[150.0, 180.0], false, 30, open());
        assert_eq!(hist.bins.len(), 30);
        assert_eq!(hist.bins[0].label, "150.00");
        assert_eq!(hist.bins[1].label, "151.00");
        assert_eq!(hist.published_total(), 2);
    }

    proptest! {
        #[test]
        fn prop_histogram_counts_sum_to_valid(
            values in prop::collection::vec(-500.0f64..500.0, 1..200),
            is_integer in any::<bool>(),
            bins in 1usize..60,
        ) {
            let values: Vec<f64> = if is_integer {
                values.iter().map(|v| v.round()).collect()
            } else {
                values
            };
            let hist = build_histogram(&values, is_integer, bins, open());
            prop_assert_eq!(hist.published_total(), values.len() as u64);
        }
    }
}
