use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;
use crate::types::{canonical_key, serialize_opt_number, OrderedMap, Result, VarType, ID_GROUP};

/// Generations Study catalog shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("../assets/generations_schema.json");

/// Code to display label, keyed by canonical code
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct CodeMap(OrderedMap<String>);

impl CodeMap {
    pub fn from_pairs<I, K, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: Into<String>,
    {
        CodeMap(
            pairs
                .into_iter()
                .map(|(k, l)| (canonical_key(k.as_ref()), l.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }

    /// Display label for a canonical value, the value itself when no code matches
    pub fn label_for(&self, code: &str) -> String {
        self.get(code).unwrap_or(code).to_string()
    }
}

impl<'de> Deserialize<'de> for CodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = OrderedMap::<String>::deserialize(deserializer)?;
        Ok(CodeMap::from_pairs(raw.iter()))
    }
}

/// Static metadata for one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Taken from the catalog map key
    #[serde(skip)]
    pub key: String,

    #[serde(default)]
    pub desc: String,

    pub group: String,

    #[serde(rename = "type")]
    pub var_type: VarType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// "Not applicable" value, distinct from missing
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_number"
    )]
    pub sentinel: Option<f64>,

    #[serde(default, skip_serializing_if = "CodeMap::is_empty")]
    pub codes: CodeMap,
}

impl VariableDescriptor {
    pub fn is_identifier(&self) -> bool {
        self.group == ID_GROUP
    }

    /// Identifiers and free strings are never aggregated
    pub fn is_aggregatable(&self) -> bool {
        !self.is_identifier() && self.var_type != VarType::String
    }

    /// Coded, non-identifier variable with a non-empty code map
    pub fn is_stratifier(&self) -> bool {
        self.var_type.is_coded() && !self.codes.is_empty() && !self.is_identifier()
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    group_labels: OrderedMap<String>,
    variables: OrderedMap<VariableDescriptor>,
}

/// Immutable variable catalog, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCatalog {
    group_labels: OrderedMap<String>,
    variables: Vec<VariableDescriptor>,
}

impl SchemaCatalog {
    /// Build a catalog, rejecting inconsistent declarations
    pub fn new(group_labels: OrderedMap<String>, variables: Vec<VariableDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for var in &variables {
            if var.key.is_empty() {
                return Err(Error::InvalidSchema("variable with empty key".to_string()));
            }
            if !seen.insert(var.key.as_str()) {
                return Err(Error::InvalidSchema(format!("duplicate variable '{}'", var.key)));
            }
            if !var.codes.is_empty() && !var.var_type.is_coded() {
                return Err(Error::InvalidSchema(format!(
                    "variable '{}' declares codes but is not binary or categorical",
                    var.key
                )));
            }
        }

        Ok(Self {
            group_labels,
            variables,
        })
    }

    /// The built-in Generations Study catalog
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Load a catalog file: `{ "group_labels": {..}, "variables": {key: descriptor} }`
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| Error::InvalidSchema(e.to_string()))?;

        let variables = file
            .variables
            .iter()
            .map(|(key, var)| VariableDescriptor {
                key: key.to_string(),
                ..var.clone()
            })
            .collect();

        Self::new(file.group_labels, variables)
    }

    /// Keep only variables whose key is one of the data columns
    pub fn restrict_to(&self, columns: &[String]) -> SchemaCatalog {
        let present: HashSet<&str> = columns.iter().map(String::as_str).collect();
        SchemaCatalog {
            group_labels: self.group_labels.clone(),
            variables: self
                .variables
                .iter()
                .filter(|v| present.contains(v.key.as_str()))
                .cloned()
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.key == key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn group_labels(&self) -> &OrderedMap<String> {
        &self.group_labels
    }

    pub fn aggregatable(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.iter().filter(|v| v.is_aggregatable())
    }

    pub fn stratifiers(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.iter().filter(|v| v.is_stratifier())
    }

    /// Descriptors as emitted in the output document, identifiers excluded
    pub fn schema_block(&self) -> OrderedMap<VariableDescriptor> {
        self.variables
            .iter()
            .filter(|v| !v.is_identifier())
            .map(|v| (v.key.clone(), v.clone()))
            .collect()
    }
}
