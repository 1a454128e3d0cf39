use std::collections::HashMap;

use serde::Serialize;

use crate::privacy::MinCellPolicy;
use crate::schema::CodeMap;
use crate::types::{FieldValue, OrderedMap};

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyCell {
    /// `None` when below the minimum cell count
    pub count: Option<u64>,
    pub label: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suppressed: bool,
}

/// Canonical value key to cell, ordered by descending count
pub type FrequencyTable = OrderedMap<FrequencyCell>;

/// Tabulate valid coded values.
///
/// Ties keep the order in which values were first seen. Labels come from
/// `codes`, falling back to the canonical key.
pub fn tabulate(values: &[&FieldValue], codes: &CodeMap, policy: MinCellPolicy) -> FrequencyTable {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tallies: Vec<(String, u64)> = Vec::new();

    for value in values {
        let key = value.canonical();
        match index.get(&key) {
            Some(&i) => tallies[i].1 += 1,
            None => {
                index.insert(key.clone(), tallies.len());
                tallies.push((key, 1));
            }
        }
    }

    // sort_by is stable
    tallies.sort_by(|a, b| b.1.cmp(&a.1));

    tallies
        .into_iter()
        .map(|(key, count)| {
            let cell = FrequencyCell {
                count: policy.publish(count),
                label: codes.label_for(&key),
                suppressed: policy.is_below(count),
            };
            (key, cell)
        })
        .collect()
}

/// Number of suppressed cells in a table
pub fn suppressed_cells(table: &FrequencyTable) -> usize {
    table.values().filter(|c| c.suppressed).count()
}
