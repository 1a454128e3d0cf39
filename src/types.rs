use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::privacy::MinCellPolicy;

/// Default minimum cell count below which counts are suppressed
pub const DEFAULT_MIN_CELL: u64 = 5;

/// Default number of bins for continuous and wide integer histograms
pub const DEFAULT_TARGET_BINS: usize = 30;

/// Decimal digits kept on every reported summary statistic
pub const STAT_DECIMALS: usize = 4;

pub const DEFAULT_INPUT: &str = "synthetic_data.json";
pub const DEFAULT_OUTPUT: &str = "aggregated_data.json";

/// Group marking identifier variables, never aggregated or emitted
pub const ID_GROUP: &str = "id";

/// A present field value of an input record.
///
/// Absent and `null` fields are not represented; a [`Record`] simply has no
/// entry for them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric reading of the value. Text counts when it parses as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Canonical string form used for grouping and code lookup.
    ///
    /// `1`, `1.0` and `"1"` all map to `"1"`; non-numeric text is kept verbatim.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Number(v) => canonical_number(*v),
            FieldValue::Text(s) => match self.as_number() {
                Some(v) => canonical_number(v),
                None => s.clone(),
            },
        }
    }
}

/// Render a number without a decimal point when it is integral
pub fn canonical_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Canonicalize a code or key given as text (`"1.0"` becomes `"1"`)
pub fn canonical_key(raw: &str) -> String {
    FieldValue::Text(raw.to_string()).canonical()
}

/// One participant: variable key to present value
pub type Record = HashMap<String, FieldValue>;

/// Records loaded from one input file
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Keys of the first record (or the header row), nulls included
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Declared type of a schema variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    String,
    Binary,
    Categorical,
    Integer,
    Numeric,
}

impl VarType {
    /// Summarised with numeric statistics and a histogram
    pub fn is_numeric(self) -> bool {
        matches!(self, VarType::Integer | VarType::Numeric)
    }

    /// Summarised with a frequency table
    pub fn is_coded(self) -> bool {
        matches!(self, VarType::Binary | VarType::Categorical)
    }
}

/// Processing options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Counts below this threshold are hidden
    pub min_cell: u64,

    /// Target bin count for continuous and wide integer histograms
    pub target_bins: usize,

    /// Whether to record the SHA-256 of the input file
    pub hash_file: bool,

    /// Whether to indent the output document
    pub pretty: bool,
}

impl ProcessingOptions {
    pub fn suppression(&self) -> MinCellPolicy {
        MinCellPolicy::new(self.min_cell)
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            min_cell: DEFAULT_MIN_CELL,
            target_bins: DEFAULT_TARGET_BINS,
            hash_file: false,
            pretty: false,
        }
    }
}

/// String-keyed map that keeps insertion order when serialized and
/// deserialized as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a value, replacing an existing entry in place
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            if map.contains_key(&key) {
                return Err(serde::de::Error::custom(format!("duplicate key '{}'", key)));
            }
            map.entries.push((key, value));
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Serialize an optional number, writing integral values without a fraction
pub fn serialize_opt_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, crate::error::Error>;
