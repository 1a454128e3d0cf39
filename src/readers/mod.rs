pub mod csv;
pub mod json;

use std::path::Path;

use crate::types::{Dataset, Result};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
    Tsv,
}

impl InputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(InputFormat::Json),
            "csv" => Some(InputFormat::Csv),
            "tsv" | "tab" => Some(InputFormat::Tsv),
            _ => None,
        }
    }
}

/// Common trait for record readers
pub trait RecordReader {
    /// Read every record into memory
    fn read(&mut self) -> Result<Dataset>;
}

/// Create a reader for the given file path
pub fn create_reader(path: &Path) -> Result<Box<dyn RecordReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let format = InputFormat::from_extension(ext).ok_or_else(|| {
        crate::error::Error::UnsupportedFormat(format!(
            "Unsupported file extension: .{}",
            ext
        ))
    })?;

    match format {
        InputFormat::Json => Ok(Box::new(json::JsonReader::new(path))),
        InputFormat::Csv => Ok(Box::new(csv::CsvReader::new(path))),
        InputFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path))),
    }
}
