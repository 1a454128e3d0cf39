use crate::types::FieldValue;

/// Missing value tokens
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "NULL", "null", "NaN", "nan", ".", "-", "--", "missing",
    "MISSING", "None", "none", "#N/A", "#VALUE!", "#REF!", "#DIV/0!", "#NUM!", "#NAME?", "#NULL!",
];

/// Check if a value represents a missing value
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

/// Parse a finite numeric value
pub fn parse_numeric(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a delimited-text cell as a field value. `None` means missing.
pub fn infer_field(cell: &str) -> Option<FieldValue> {
    if is_missing(cell) {
        return None;
    }
    Some(match parse_numeric(cell) {
        Some(v) => FieldValue::Number(v),
        None => FieldValue::Text(cell.trim().to_string()),
    })
}
