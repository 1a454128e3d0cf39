/// Minimum-cell suppression rule shared by histograms, frequency tables and strata.
///
/// A count strictly below `min_cell` is never emitted. With `min_cell == 0`
/// nothing is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinCellPolicy {
    min_cell: u64,
}

impl MinCellPolicy {
    pub fn new(min_cell: u64) -> Self {
        Self { min_cell }
    }

    /// Whether a true count must be hidden
    pub fn is_below(&self, count: u64) -> bool {
        count < self.min_cell
    }

    /// The count as it may be published: `None` when suppressed
    pub fn publish(&self, count: u64) -> Option<u64> {
        if self.is_below(count) {
            None
        } else {
            Some(count)
        }
    }

    /// Whether a whole stratum of `n` records must be hidden, detail included
    pub fn hides_stratum(&self, n: usize) -> bool {
        self.is_below(n as u64)
    }
}

impl Default for MinCellPolicy {
    fn default() -> Self {
        Self::new(crate::types::DEFAULT_MIN_CELL)
    }
}
