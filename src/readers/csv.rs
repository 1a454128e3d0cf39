use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder};

use crate::inference::infer_field;
use crate::types::{Dataset, Record, Result};

use super::RecordReader;

/// CSV/TSV record reader; the header row names the variables
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b',',
        }
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        }
    }

    fn create_reader(&self) -> Result<Reader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let csv_reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Ok(csv_reader)
    }
}

impl RecordReader for CsvReader {
    fn read(&mut self) -> Result<Dataset> {
        let mut reader = self.create_reader()?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let mut record = Record::with_capacity(columns.len());
            // Short rows leave trailing columns missing
            for (column, cell) in columns.iter().zip(row.iter()) {
                if let Some(value) = infer_field(cell) {
                    record.insert(column.clone(), value);
                }
            }
            records.push(record);
        }

        Ok(Dataset { columns, records })
    }
}
