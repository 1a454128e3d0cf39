use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::aggregate::{aggregate_group, VariableSummary};
use crate::frequency::suppressed_cells;
use crate::schema::{SchemaCatalog, VariableDescriptor};
use crate::types::{OrderedMap, ProcessingOptions, Record, Result};

/// One group of a stratification
#[derive(Debug, Clone, PartialEq)]
pub enum Stratum {
    /// Group below the minimum cell count: only the label is published
    Suppressed { label: String },
    Reported {
        label: String,
        n: usize,
        variables: OrderedMap<VariableSummary>,
    },
}

#[cfg(test)]
impl Stratum {
    pub fn label(&self) -> &str {
        match self {
            Stratum::Suppressed { label } | Stratum::Reported { label, .. } => label,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Stratum::Suppressed { .. })
    }
}

impl Serialize for Stratum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Stratum::Suppressed { label } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("label", label)?;
                map.serialize_entry("n", &None::<u64>)?;
                map.serialize_entry("suppressed", &true)?;
                map.end()
            }
            Stratum::Reported {
                label,
                n,
                variables,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("label", label)?;
                map.serialize_entry("n", n)?;
                map.serialize_entry("variables", variables)?;
                map.end()
            }
        }
    }
}

/// Stratified results for every eligible stratifier, plus suppression tallies
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stratification {
    /// Stratifier key to group key to stratum
    pub strata: OrderedMap<OrderedMap<Stratum>>,
    pub suppressed_strata: usize,
    pub suppressed_cells: usize,
}

impl Stratification {
    pub fn stratifier_keys(&self) -> Vec<String> {
        self.strata.keys().map(str::to_string).collect()
    }
}

/// Group records by the canonical value of `key`. Records with no value are dropped.
fn partition<'a>(records: &'a [Record], key: &str) -> BTreeMap<String, Vec<&'a Record>> {
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        if let Some(value) = record.get(key) {
            groups.entry(value.canonical()).or_default().push(record);
        }
    }
    groups
}

/// Stratify by a single variable, adding to the suppression tallies
fn stratify_by(
    records: &[Record],
    stratifier: &VariableDescriptor,
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
    tallies: &mut Stratification,
) -> Result<OrderedMap<Stratum>> {
    let policy = options.suppression();
    let mut out = OrderedMap::new();

    for (group_key, members) in partition(records, &stratifier.key) {
        let label = stratifier.codes.label_for(&group_key);

        if policy.hides_stratum(members.len()) {
            tallies.suppressed_strata += 1;
            out.insert(group_key, Stratum::Suppressed { label });
            continue;
        }

        let variables =
            aggregate_group(&members, catalog, options, Some(stratifier.key.as_str()))?;
        tallies.suppressed_cells += variables
            .values()
            .filter_map(|v| v.frequencies.as_ref())
            .map(suppressed_cells)
            .sum::<usize>();

        debug!(stratifier = %stratifier.key, group = %group_key, "stratum aggregated");
        out.insert(
            group_key,
            Stratum::Reported {
                label,
                n: members.len(),
                variables,
            },
        );
    }

    Ok(out)
}

/// Run the stratified aggregation for every eligible stratifier in catalog order
pub fn stratify(
    records: &[Record],
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
) -> Result<Stratification> {
    let mut result = Stratification::default();

    for stratifier in catalog.stratifiers() {
        info!("Stratifying by {}", stratifier.key);
        let groups = stratify_by(records, stratifier, catalog, options, &mut result)?;
        result.strata.insert(stratifier.key.clone(), groups);
    }

    info!(
        min_cell = options.min_cell,
        suppressed_strata = result.suppressed_strata,
        suppressed_cells = result.suppressed_cells,
        "Suppression applied"
    );
    Ok(result)
}
