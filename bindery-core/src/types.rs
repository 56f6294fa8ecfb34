//! Context value tree and validation report types.
//!
//! Caller-supplied JSON is converted into [`ContextValue`] at the API
//! boundary, so every downstream consumer sees an explicitly tagged shape
//! (scalar, sequence, or mapping) instead of raw `serde_json::Value`.
//! Mappings use `BTreeMap` so iteration order is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::ContextError;

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// A leaf value in a render context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

// ---------------------------------------------------------------------------
// Context values
// ---------------------------------------------------------------------------

/// A context value: a scalar, a sequence of values, or a string-keyed mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(Scalar),
    Sequence(Vec<ContextValue>),
    Mapping(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextValue::Scalar(Scalar::Null) => "null",
            ContextValue::Scalar(Scalar::Bool(_)) => "boolean",
            ContextValue::Scalar(Scalar::Int(_)) | ContextValue::Scalar(Scalar::Float(_)) => {
                "number"
            }
            ContextValue::Scalar(Scalar::Text(_)) => "string",
            ContextValue::Sequence(_) => "sequence",
            ContextValue::Mapping(_) => "mapping",
        }
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ContextValue::Scalar(Scalar::Null),
            Value::Bool(b) => ContextValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ContextValue::Scalar(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    ContextValue::Scalar(Scalar::Float(f))
                } else {
                    ContextValue::Scalar(Scalar::Null)
                }
            }
            Value::String(s) => ContextValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                ContextValue::Sequence(items.into_iter().map(ContextValue::from).collect())
            }
            Value::Object(map) => ContextValue::Mapping(
                map.into_iter().map(|(k, v)| (k, ContextValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Scalar(Scalar::Text(s.to_owned()))
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Scalar(Scalar::Text(s))
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        ContextValue::Scalar(Scalar::Float(f))
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Scalar(Scalar::Bool(b))
    }
}

impl From<Vec<ContextValue>> for ContextValue {
    fn from(items: Vec<ContextValue>) -> Self {
        ContextValue::Sequence(items)
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        ContextValue::Mapping(map)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Render context
// ---------------------------------------------------------------------------

/// The data supplied to fill one template instance.
///
/// The top level is always a mapping; construction from JSON rejects any
/// other shape with [`ContextError::NotAMapping`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    values: BTreeMap<String, ContextValue>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a parsed JSON value. The value must be an object.
    pub fn from_value(value: Value) -> Result<Self, ContextError> {
        match value {
            Value::Object(map) => Ok(RenderContext {
                values: map.into_iter().map(|(k, v)| (k, ContextValue::from(v))).collect(),
            }),
            other => Err(ContextError::NotAMapping {
                found: json_kind(&other),
            }),
        }
    }

    /// Parse a JSON string and build a context from it.
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Validation report
// ---------------------------------------------------------------------------

/// Outcome of checking a template against a list of required placeholders.
///
/// `missing_placeholders` is sorted and deduplicated; extra placeholders in
/// the template are not an error and are not reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub missing_placeholders: Vec<String>,
}

impl ValidationReport {
    /// Build a report from the set of missing names (sorted, deduplicated).
    pub fn from_missing(mut missing: Vec<String>) -> Self {
        missing.sort();
        missing.dedup();
        ValidationReport {
            is_valid: missing.is_empty(),
            missing_placeholders: missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
