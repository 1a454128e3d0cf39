use serde::Serialize;
use tracing::debug;

use crate::error::Error;
use crate::frequency::{tabulate, FrequencyTable};
use crate::histogram::{build_histogram, Histogram};
use crate::schema::{SchemaCatalog, VariableDescriptor};
use crate::stats::NumericSummary;
use crate::types::{FieldValue, OrderedMap, ProcessingOptions, Record, Result, VarType};

/// Aggregation result for one variable over one group of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub n_total: usize,
    pub n_valid: usize,
    pub n_null: usize,
    pub n_sentinel: usize,

    /// Absent for non-numeric variables and for numeric ones with no valid values
    #[serde(flatten)]
    pub numeric: Option<NumericSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<FrequencyTable>,
}

/// Values of one variable split into null, sentinel and valid
#[derive(Debug)]
struct Census<'a> {
    n_total: usize,
    n_null: usize,
    n_sentinel: usize,
    valid: Vec<&'a FieldValue>,
}

fn census<'a>(records: &[&'a Record], var: &VariableDescriptor) -> Census<'a> {
    let mut census = Census {
        n_total: records.len(),
        n_null: 0,
        n_sentinel: 0,
        valid: Vec::with_capacity(records.len()),
    };

    for record in records {
        match record.get(&var.key) {
            None => census.n_null += 1,
            Some(value) if var.sentinel.is_some() && value.as_number() == var.sentinel => {
                census.n_sentinel += 1
            }
            Some(value) => census.valid.push(value),
        }
    }
    census
}

/// Aggregate a single variable over a group of records.
///
/// Dispatches on the declared type: numeric and integer variables get a
/// numeric summary and histogram, binary and categorical a frequency table,
/// strings only the count block.
pub fn aggregate_variable(
    records: &[&Record],
    var: &VariableDescriptor,
    options: &ProcessingOptions,
) -> Result<VariableSummary> {
    let census = census(records, var);
    let policy = options.suppression();

    let mut summary = VariableSummary {
        n_total: census.n_total,
        n_valid: census.valid.len(),
        n_null: census.n_null,
        n_sentinel: census.n_sentinel,
        numeric: None,
        histogram: None,
        frequencies: None,
    };

    match var.var_type {
        VarType::Numeric | VarType::Integer => {
            let values = census
                .valid
                .iter()
                .map(|v| {
                    v.as_number().ok_or_else(|| Error::NonNumericValue {
                        variable: var.key.clone(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            summary.numeric = NumericSummary::from_values(&values);
            summary.histogram = Some(build_histogram(
                &values,
                var.var_type == VarType::Integer,
                options.target_bins,
                policy,
            ));
        }
        VarType::Categorical | VarType::Binary => {
            summary.frequencies = Some(tabulate(&census.valid, &var.codes, policy));
        }
        VarType::String => {}
    }

    Ok(summary)
}

/// Aggregate every aggregatable catalog variable over a group, optionally
/// skipping one key (the stratifier when called per stratum)
pub fn aggregate_group(
    records: &[&Record],
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
    skip: Option<&str>,
) -> Result<OrderedMap<VariableSummary>> {
    let mut out = OrderedMap::new();
    for var in catalog.aggregatable() {
        if skip == Some(var.key.as_str()) {
            continue;
        }
        out.insert(var.key.clone(), aggregate_variable(records, var, options)?);
    }
    Ok(out)
}

/// Whole-cohort results for every aggregatable variable
pub fn aggregate_cohort(
    records: &[Record],
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
) -> Result<OrderedMap<VariableSummary>> {
    debug!(n = records.len(), "aggregating whole cohort");
    let refs: Vec<&Record> = records.iter().collect();
    aggregate_group(&refs, catalog, options, None)
}
