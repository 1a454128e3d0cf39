use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::aggregate::VariableSummary;
use crate::schema::{SchemaCatalog, VariableDescriptor};
use crate::strata::{Stratification, Stratum};
use crate::types::{OrderedMap, Result};

/// Run metadata block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// RFC 3339 UTC timestamp of the run
    pub created: String,
    pub source_file: String,
    /// SHA-256 of the input file, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    pub n: usize,
    pub n_variables: usize,
    pub strat_variables: Vec<String>,
    pub min_cell: u64,
    pub suppressed_strata: usize,
    pub suppressed_cells: usize,
    pub tool: String,
}

/// Facts about the run known before aggregation
#[derive(Debug, Clone)]
pub struct RunContext {
    pub created: String,
    pub source_file: String,
    pub source_sha256: Option<String>,
    pub n: usize,
    pub min_cell: u64,
}

/// The complete aggregate document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedReport {
    pub meta: RunMetadata,
    pub group_labels: OrderedMap<String>,
    pub schema: OrderedMap<VariableDescriptor>,
    pub whole_cohort: OrderedMap<VariableSummary>,
    pub strata: OrderedMap<OrderedMap<Stratum>>,
}

/// Compose the output document from already computed parts
pub fn assemble(
    context: RunContext,
    catalog: &SchemaCatalog,
    whole_cohort: OrderedMap<VariableSummary>,
    stratification: Stratification,
) -> AggregatedReport {
    let meta = RunMetadata {
        created: context.created,
        source_file: context.source_file,
        source_sha256: context.source_sha256,
        n: context.n,
        n_variables: whole_cohort.len(),
        strat_variables: stratification.stratifier_keys(),
        min_cell: context.min_cell,
        suppressed_strata: stratification.suppressed_strata,
        suppressed_cells: stratification.suppressed_cells,
        tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    };

    AggregatedReport {
        meta,
        group_labels: catalog.group_labels().clone(),
        schema: catalog.schema_block(),
        whole_cohort,
        strata: stratification.strata,
    }
}

/// Serialize the report, compact unless `pretty`
pub fn to_json_bytes(report: &AggregatedReport, pretty: bool) -> Result<Vec<u8>> {
    if pretty {
        Ok(serde_json::to_vec_pretty(report)?)
    } else {
        Ok(serde_json::to_vec(report)?)
    }
}

/// Write the report to a file in one call, so a failed run leaves nothing behind
pub fn write_json_file(report: &AggregatedReport, path: &Path, pretty: bool) -> Result<u64> {
    let bytes = to_json_bytes(report, pretty)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Write the report to stdout
pub fn write_json_stdout(report: &AggregatedReport, pretty: bool) -> Result<()> {
    let bytes = to_json_bytes(report, pretty)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(&bytes)?;
    writeln!(handle)?;
    Ok(())
}
