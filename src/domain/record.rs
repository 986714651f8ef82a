//! Raw clinical record as delivered by the request boundary.
//!
//! Field names follow the UCI chronic kidney disease panel (`age`, `bp`,
//! `sc`, `hemo`, ...). Values are either numeric or a small categorical
//! vocabulary; nothing is validated here, coercion happens in
//! [`crate::domain::features`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Required fields of the clinical panel.
pub const RECORD_FIELDS: [&str; 19] = [
    "age", "bp", "al", "su", "rbc", "pc", "ba", "bgr", "bu", "sc", "sod", "pot", "hemo", "wbcc",
    "htn", "dm", "appet", "pe", "ane",
];

/// A single raw field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric reading (mg/dL, mmHg, years, ...)
    Number(f64),
    /// Categorical or unparsed text ("yes", "abnormal", "1.4", ...)
    Text(String),
    /// JSON boolean, treated as a yes/no flag
    Flag(bool),
    /// Explicit null
    Missing,
}

impl FieldValue {
    /// Coerce to a finite number, if possible.
    ///
    /// Text is trimmed and parsed; booleans map to 1/0. NaN and infinities
    /// are rejected so they never reach the derived features.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Flag(b) => f64::from(u8::from(*b)),
            Self::Missing => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Text form of the value, lowercased and trimmed.
    #[must_use]
    pub fn as_category(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.trim().to_ascii_lowercase()),
            Self::Flag(true) => Some("yes".to_string()),
            Self::Flag(false) => Some("no".to_string()),
            Self::Number(_) | Self::Missing => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Immutable field name -> raw value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicalRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl ClinicalRecord {
    /// Build a record from any iterator of `(name, value)` pairs.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a record from a JSON object.
    ///
    /// # Errors
    /// Returns error if the value is not an object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, crate::NephroError> {
        let object = value.as_object().ok_or_else(|| {
            crate::NephroError::Validation(format!(
                "Expected a JSON object of clinical fields, got {}",
                json_kind(value)
            ))
        })?;

        let fields = object
            .iter()
            .map(|(k, v)| {
                let field = match v {
                    serde_json::Value::Number(n) => {
                        n.as_f64().map_or(FieldValue::Missing, FieldValue::Number)
                    }
                    serde_json::Value::String(s) => FieldValue::Text(s.clone()),
                    serde_json::Value::Bool(b) => FieldValue::Flag(*b),
                    // Nested values carry no clinical meaning here.
                    _ => FieldValue::Missing,
                };
                (k.clone(), field)
            })
            .collect();

        Ok(Self { fields })
    }

    /// Raw value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Numeric value of a field, `None` when absent or not coercible.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    /// Numeric value of a field, or `default` when absent or not coercible.
    #[must_use]
    pub fn number_or(&self, field: &str, default: f64) -> f64 {
        self.number(field).unwrap_or(default)
    }

    /// Whether a yes/no flag field is set to "yes".
    #[must_use]
    pub fn is_yes(&self, field: &str) -> bool {
        match self.get(field) {
            Some(v) => match v.as_number() {
                Some(n) => n != 0.0,
                None => v.as_category().is_some_and(|c| c == "yes"),
            },
            None => false,
        }
    }

    /// Required fields that are absent from this record.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        RECORD_FIELDS
            .iter()
            .copied()
            .filter(|f| !self.fields.contains_key(*f))
            .collect()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
