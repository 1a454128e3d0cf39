use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::aggregate::aggregate_cohort;
use crate::error::Error;
use crate::output::{assemble, AggregatedReport, RunContext};
use crate::readers::create_reader;
use crate::schema::SchemaCatalog;
use crate::strata::stratify;
use crate::types::{Dataset, ProcessingOptions, Result};

/// Read an input file and produce the aggregate report
pub fn build_report(
    input: &Path,
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
) -> Result<AggregatedReport> {
    info!("Reading {}", input.display());
    let mut reader = create_reader(input)?;
    let dataset = reader.read()?;
    info!("{} records loaded", dataset.len());

    let source_sha256 = if options.hash_file {
        Some(compute_file_hash(input)?)
    } else {
        None
    };

    let context = RunContext {
        created: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        source_file: input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string(),
        source_sha256,
        n: dataset.len(),
        min_cell: options.min_cell,
    };

    aggregate_dataset(&dataset, catalog, options, context)
}

/// Aggregate an in-memory dataset: whole cohort, then strata, then assembly
pub fn aggregate_dataset(
    dataset: &Dataset,
    catalog: &SchemaCatalog,
    options: &ProcessingOptions,
    context: RunContext,
) -> Result<AggregatedReport> {
    if dataset.is_empty() {
        return Err(Error::InvalidInput("Input contains no records".to_string()));
    }

    let catalog = catalog.restrict_to(&dataset.columns);
    info!("{} schema variables matched to data columns", catalog.len());

    info!("Aggregating whole cohort (n={})", dataset.len());
    let whole_cohort = aggregate_cohort(&dataset.records, &catalog, options)?;
    let stratification = stratify(&dataset.records, &catalog, options)?;

    Ok(assemble(context, &catalog, whole_cohort, stratification))
}

/// Compute SHA-256 hash of a file (streaming to handle large files)
fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::to_json_bytes;
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// 100 participants: 52 smokers / 48 non-smokers, 3 with diabetes
    fn synthetic_records() -> Value {
        let records: Vec<Value> = (0..100)
            .map(|i| {
                json!({
                    "R0_TCode": format!("ID{:06}", i),
                    "R0_SmokingStatus": if i < 52 { 2 } else { 0 },
                    "R0_DiabetesStatus": if i < 3 { 1 } else { 0 },
                    "R0_Height": 150.0 + (i % 40) as f64 * 0.75,
                    "R0_BMI": if i % 10 == 0 { json!(999) } else { json!(20.0 + (i % 15) as f64) },
                    "R0_AgeMenarche": 11 + (i % 5),
                    "R0_Parity": if i % 7 == 0 { Value::Null } else { json!(i % 4) },
                })
            })
            .collect();
        Value::Array(records)
    }

    fn write_input(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    fn run(value: &Value, options: &ProcessingOptions) -> Value {
        let file = write_input(value);
        let catalog = SchemaCatalog::builtin().unwrap();
        let report = build_report(file.path(), &catalog, options).unwrap();
        serde_json::from_slice(&to_json_bytes(&report, false).unwrap()).unwrap()
    }

    fn count_sum(counts: &Value) -> u64 {
        counts
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_u64)
            .sum()
    }

    #[test]
    fn test_compute_file_hash() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "test content").unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert_eq!(hash.len(), 64); // SHA-256 produces 64 hex chars
    }

    #[test]
    fn test_meta_block() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());
        let meta = &out["meta"];
        assert_eq!(meta["n"], 100);
        assert_eq!(meta["n_variables"], 6);
        assert_eq!(meta["min_cell"], 5);
        assert_eq!(
            meta["strat_variables"],
            json!(["R0_SmokingStatus", "R0_DiabetesStatus"])
        );
        assert!(meta["source_file"].as_str().unwrap().ends_with(".json"));
        assert!(meta.get("source_sha256").is_none());
    }

    #[test]
    fn test_schema_block_filtered_to_present_columns() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());
        let schema = out["schema"].as_object().unwrap();
        assert_eq!(schema.len(), 6);
        assert!(!schema.contains_key("R0_TCode"));
        assert!(!schema.contains_key("R0_Weight"));
        assert_eq!(out["schema"]["R0_BMI"]["sentinel"], 999);
        assert_eq!(out["schema"]["R0_SmokingStatus"]["codes"]["2"], "Current");
        assert!(out["whole_cohort"].get("R0_TCode").is_none());
    }

    #[test]
    fn test_count_block_invariants() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());
        let bmi = &out["whole_cohort"]["R0_BMI"];
        assert_eq!(bmi["n_total"], 100);
        assert_eq!(bmi["n_sentinel"], 10);
        assert_eq!(bmi["n_valid"], 90);
        assert_eq!(bmi["n_null"], 0);

        let parity = &out["whole_cohort"]["R0_Parity"];
        assert_eq!(parity["n_null"], 15);
        assert_eq!(parity["n_valid"], 85);
        assert_eq!(parity["n_sentinel"], 0);
    }

    #[test]
    fn test_histogram_and_frequency_sums_without_suppression() {
        let options = ProcessingOptions {
            min_cell: 0,
            ..ProcessingOptions::default()
        };
        let out = run(&synthetic_records(), &options);

        for key in ["R0_Height", "R0_BMI", "R0_AgeMenarche", "R0_Parity"] {
            let var = &out["whole_cohort"][key];
            assert_eq!(
                count_sum(&var["histogram"]["counts"]),
                var["n_valid"].as_u64().unwrap(),
                "histogram of {}",
                key
            );
        }

        let smoking = &out["whole_cohort"]["R0_SmokingStatus"]["frequencies"];
        let total: u64 = smoking
            .as_object()
            .unwrap()
            .values()
            .map(|c| c["count"].as_u64().unwrap())
            .sum();
        assert_eq!(total, 100);
        assert_eq!(smoking["2"]["label"], "Current");
    }

    #[test]
    fn test_integer_histogram_one_bin_per_value() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());
        let hist = &out["whole_cohort"]["R0_AgeMenarche"]["histogram"];
        assert_eq!(hist["labels"], json!(["11", "12", "13", "14", "15"]));
        assert_eq!(hist["counts"], json!([20, 20, 20, 20, 20]));
    }

    #[test]
    fn test_small_stratum_is_hidden_whole() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());

        let diabetes = &out["strata"]["R0_DiabetesStatus"];
        assert_eq!(diabetes["1"], json!({"label": "Yes", "n": null, "suppressed": true}));
        assert_eq!(diabetes["0"]["n"], 97);
        assert!(diabetes["0"]["variables"]["R0_Height"].is_object());
        assert!(diabetes["0"]["variables"].get("R0_DiabetesStatus").is_none());

        let smoking = &out["strata"]["R0_SmokingStatus"];
        assert_eq!(smoking["0"]["n"], 48);
        assert_eq!(smoking["2"]["n"], 52);
        assert_eq!(smoking["2"]["label"], "Current");

        assert_eq!(out["meta"]["suppressed_strata"], 1);
    }

    #[test]
    fn test_small_cells_never_published() {
        let out = run(&synthetic_records(), &ProcessingOptions::default());
        let smoking = &out["strata"]["R0_SmokingStatus"];

        // 3 diabetics are all among the first 52 (smokers)
        let cell = &smoking["2"]["variables"]["R0_DiabetesStatus"]["frequencies"]["1"];
        assert_eq!(cell["count"], Value::Null);
        assert_eq!(cell["suppressed"], true);
        assert_eq!(cell["label"], "Yes");
        assert_eq!(out["meta"]["suppressed_cells"], 1);

        fn check_counts(v: &Value) {
            match v {
                Value::Object(map) => {
                    if let Some(c) = map.get("count").and_then(Value::as_u64) {
                        assert!(c >= 5, "published count {} below threshold", c);
                    }
                    if let Some(counts) = map.get("counts").and_then(Value::as_array) {
                        for c in counts.iter().filter_map(Value::as_u64) {
                            assert!(c >= 5, "published bin {} below threshold", c);
                        }
                    }
                    map.values().for_each(check_counts);
                }
                Value::Array(items) => items.iter().for_each(check_counts),
                _ => {}
            }
        }
        check_counts(&out["whole_cohort"]);
        check_counts(&out["strata"]);
    }

    #[test]
    fn test_no_identifiers_in_output() {
        let file = write_input(&synthetic_records());
        let catalog = SchemaCatalog::builtin().unwrap();
        let report = build_report(file.path(), &catalog, &ProcessingOptions::default()).unwrap();
        let text = String::from_utf8(to_json_bytes(&report, false).unwrap()).unwrap();
        assert!(!text.contains("ID000001"));
    }

    #[test]
    fn test_deterministic_apart_from_timestamp() {
        let mut first = run(&synthetic_records(), &ProcessingOptions::default());
        let mut second = run(&synthetic_records(), &ProcessingOptions::default());
        first["meta"]["created"] = Value::Null;
        second["meta"]["created"] = Value::Null;
        first["meta"]["source_file"] = Value::Null;
        second["meta"]["source_file"] = Value::Null;
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_hash_file_option() {
        let options = ProcessingOptions {
            hash_file: true,
            ..ProcessingOptions::default()
        };
        let out = run(&synthetic_records(), &options);
        assert_eq!(out["meta"]["source_sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_empty_input_rejected() {
        let file = write_input(&json!([]));
        let catalog = SchemaCatalog::builtin().unwrap();
        let result = build_report(file.path(), &catalog, &ProcessingOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_non_array_input_rejected() {
        let file = write_input(&json!({"R0_BMI": 22}));
        let catalog = SchemaCatalog::builtin().unwrap();
        let result = build_report(file.path(), &catalog, &ProcessingOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_csv_input() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "R0_TCode,R0_AshkenaziAncestry,R0_Height").unwrap();
        for i in 0..20 {
            writeln!(file, "T{},{},{}", i, i % 2, 160 + i).unwrap();
        }

        let catalog = SchemaCatalog::builtin().unwrap();
        let report = build_report(file.path(), &catalog, &ProcessingOptions::default()).unwrap();
        assert_eq!(report.meta.n, 20);
        assert_eq!(report.meta.strat_variables, vec!["R0_AshkenaziAncestry"]);
        assert_eq!(report.whole_cohort.get("R0_Height").unwrap().n_valid, 20);
    }
}
