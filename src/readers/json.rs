use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Error;
use crate::types::{Dataset, FieldValue, Record, Result};

use super::RecordReader;

/// Reader for a JSON array of flat record objects
pub struct JsonReader {
    path: PathBuf,
}

impl JsonReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl RecordReader for JsonReader {
    fn read(&mut self) -> Result<Dataset> {
        let file = File::open(&self.path)?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        dataset_from_value(value)
    }
}

/// Convert a parsed JSON document into records
pub fn dataset_from_value(value: Value) -> Result<Dataset> {
    let Value::Array(items) = value else {
        return Err(Error::InvalidInput(
            "Input must be a JSON array of records".to_string(),
        ));
    };

    let mut dataset = Dataset::default();
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(Error::InvalidInput(format!(
                "Record {} is not a JSON object",
                index
            )));
        };

        if index == 0 {
            dataset.columns = fields.keys().cloned().collect();
        }

        let mut record = Record::with_capacity(fields.len());
        for (key, field) in fields {
            let value = match field {
                Value::Null => continue,
                Value::Number(n) => match n.as_f64() {
                    Some(v) => FieldValue::Number(v),
                    None => continue,
                },
                Value::String(s) => FieldValue::Text(s),
                Value::Bool(b) => FieldValue::Number(if b { 1.0 } else { 0.0 }),
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::InvalidInput(format!(
                        "Record {} field '{}' is not a scalar",
                        index, key
                    )));
                }
            };
            record.insert(key, value);
        }
        dataset.records.push(record);
    }

    Ok(dataset)
}
