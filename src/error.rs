use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A numeric or integer variable holds a value that cannot be read as a number.
    /// Names the variable only, never the value.
    #[error("Variable '{variable}' contains a non-numeric value")]
    NonNumericValue { variable: String },

    #[error("Logging error: {0}")]
    Logging(String),
}
