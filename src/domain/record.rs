//! Normalized records
//!
//! A [`NormalizedRecord`] always carries exactly the declared columns of its
//! domain, in declaration order. Records are created pre-filled with column
//! defaults, so a field missing upstream can never become a missing key.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::ColumnSpec;

/// Values treated as uninformative by the QA pass
pub const SENTINEL_TEXTS: &[&str] = &["", "0", "False", "Unknown", "unknown"];

/// Scalar or structured cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// List or mapping kept in parsed form until rendering
    Compound(Value),
}

impl FieldValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Text used for comparisons and rendering.
    ///
    /// Compound values serialize to compact JSON; object keys come out sorted,
    /// so the form is stable across runs.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Compound(v) => serde_json::to_string(v).unwrap_or_default(),
        }
    }

    /// Empty, false, zero, or a placeholder string
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) | Self::Int(0) => true,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => SENTINEL_TEXTS.contains(&s.as_str()),
            Self::Bool(true) | Self::Int(_) | Self::Compound(_) => false,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Compound(value.clone()),
        }
    }
}

impl From<Option<&Value>> for FieldValue {
    fn from(value: Option<&Value>) -> Self {
        value.map_or(Self::Null, Self::from)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One flat report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    fields: IndexMap<&'static str, FieldValue>,
}

impl NormalizedRecord {
    /// New record holding the default of every declared column
    #[must_use]
    pub fn with_defaults(columns: &[ColumnSpec]) -> Self {
        let fields = columns
            .iter()
            .map(|column| (column.name, column.kind.default_value()))
            .collect();
        Self { fields }
    }

    /// Sets a declared column. Undeclared names are ignored and reported as `false`.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> bool {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => {
                tracing::debug!("Ignoring undeclared column '{}'", name);
                false
            }
        }
    }

    /// Sets a column from an optional JSON value, keeping the column default when absent
    pub fn set_json(&mut self, name: &str, value: Option<&Value>) -> bool {
        match value {
            Some(Value::Null) | None => self.fields.contains_key(name),
            Some(v) => self.set(name, FieldValue::from(v)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Value of the column at `index` in declaration order
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get_index(index).map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when the record holds exactly `columns`, in order
    #[must_use]
    pub fn matches_columns(&self, columns: &[ColumnSpec]) -> bool {
        self.fields.len() == columns.len()
            && self
                .fields
                .keys()
                .zip(columns)
                .all(|(name, column)| *name == column.name)
    }
}
