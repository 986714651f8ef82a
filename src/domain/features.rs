//! Feature derivation for CKD risk prediction.
//!
//! Turns a [`ClinicalRecord`] into the canonical 21-feature vector used by the
//! exported models: 18 raw fields (categoricals mapped to 0/1) followed by
//! three derived features.

use serde::{Deserialize, Serialize};

use super::record::ClinicalRecord;

/// Serum creatinine above this value (mg/dL) sets `high_creatinine`.
///
/// Upper limit of the normal adult range. Used everywhere the flag is needed.
pub const HIGH_CREATININE_MG_DL: f64 = 1.2;

/// Canonical feature order produced by [`derive`].
pub const FEATURE_NAMES: [&str; 21] = [
    "age",
    "bp",
    "al",
    "su",
    "rbc",
    "pc",
    "bgr",
    "bu",
    "sc",
    "sod",
    "pot",
    "hemo",
    "wbcc",
    "htn",
    "dm",
    "appet",
    "pe",
    "ane",
    "bun_sc_ratio",
    "high_creatinine",
    "hemo_bu",
];

/// Fields read as categoricals; all others are numeric.
const CATEGORICAL_FIELDS: [&str; 8] = ["rbc", "pc", "ba", "htn", "dm", "appet", "pe", "ane"];

/// Map a categorical token to 0/1. Unknown tokens map to 0.
#[must_use]
pub fn categorical_code(token: &str) -> f64 {
    match token {
        "abnormal" | "present" | "yes" | "poor" => 1.0,
        // normal, notpresent, no, good and anything unrecognised
        _ => 0.0,
    }
}

/// Ordered sequence of named numeric features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    features: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Build a vector from explicit `(name, value)` pairs, keeping their order.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            features: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Value of a named feature.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Value of a named feature, 0 when absent.
    #[must_use]
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    /// Feature names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|(n, _)| n.as_str())
    }

    /// Feature values in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.features.iter().map(|(_, v)| *v).collect()
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Align this vector to a consumer's declared schema.
    ///
    /// Lookup is by name: expected features that are missing become 0,
    /// features not in `expected` are dropped, and the output follows
    /// `expected` exactly.
    #[must_use]
    pub fn reconcile<S: AsRef<str>>(&self, expected: &[S]) -> Vec<f64> {
        expected.iter().map(|name| self.value(name.as_ref())).collect()
    }
}

/// Derive the canonical feature vector from a raw record.
///
/// Never fails: uncoercible numerics and unknown categories become 0.
#[must_use]
pub fn derive(record: &ClinicalRecord) -> FeatureVector {
    let field = |name: &str| -> f64 {
        if CATEGORICAL_FIELDS.contains(&name) {
            return categorical_field(record, name);
        }
        match record.get(name) {
            None => 0.0,
            Some(raw) => raw.as_number().unwrap_or_else(|| {
                tracing::debug!(field = name, "Uncoercible numeric field, defaulting to 0");
                0.0
            }),
        }
    };

    let bu = field("bu");
    let sc = field("sc");
    let hemo = field("hemo");

    let bun_sc_ratio = if sc == 0.0 { 0.0 } else { finite_or_zero(bu / sc) };
    let high_creatinine = if sc > HIGH_CREATININE_MG_DL { 1.0 } else { 0.0 };
    let hemo_bu = finite_or_zero(hemo * bu);

    let mut features: Vec<(String, f64)> = FEATURE_NAMES[..18]
        .iter()
        .map(|name| ((*name).to_string(), field(*name)))
        .collect();
    features.push(("bun_sc_ratio".to_string(), bun_sc_ratio));
    features.push(("high_creatinine".to_string(), high_creatinine));
    features.push(("hemo_bu".to_string(), hemo_bu));

    FeatureVector { features }
}

fn categorical_field(record: &ClinicalRecord, name: &str) -> f64 {
    let Some(raw) = record.get(name) else {
        return 0.0;
    };
    // Pre-encoded 0/1 inputs pass through.
    if let Some(n) = raw.as_number() {
        return if n != 0.0 { 1.0 } else { 0.0 };
    }
    raw.as_category()
        .map_or(0.0, |token| categorical_code(&token))
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ClinicalRecord {
        ClinicalRecord::from_json(&value).expect("Should parse record")
    }

    #[test]
    fn test_derive_order_and_length() {
        let features = derive(&ClinicalRecord::default());
        assert_eq!(features.len(), 21);
        let names: Vec<&str> = features.names().collect();
        assert_eq!(names, FEATURE_NAMES.to_vec());
        assert!(features.to_vec().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_categorical_mapping() {
        let features = derive(&record(json!({
            "rbc": "abnormal",
            "pc": "normal",
            "htn": "yes",
            "dm": "no",
            "appet": "poor",
            "pe": "maybe",
            "ane": 1,
        })));
        assert_eq!(features.value("rbc"), 1.0);
        assert_eq!(features.value("pc"), 0.0);
        assert_eq!(features.value("htn"), 1.0);
        assert_eq!(features.value("dm"), 0.0);
        assert_eq!(features.value("appet"), 1.0);
        assert_eq!(features.value("pe"), 0.0);
        assert_eq!(features.value("ane"), 1.0);
    }

    #[test]
    fn test_malformed_numeric_defaults_to_zero() {
        let features = derive(&record(json!({ "age": "sixty", "bp": "130" })));
        assert_eq!(features.value("age"), 0.0);
        assert_eq!(features.value("bp"), 130.0);
    }

    #[test]
    fn test_derived_features() {
        let features = derive(&record(json!({ "bu": 40, "sc": 2.0, "hemo": 10 })));
        assert!((features.value("bun_sc_ratio") - 20.0).abs() < f64::EPSILON);
        assert_eq!(features.value("high_creatinine"), 1.0);
        assert!((features.value("hemo_bu") - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_creatinine_ratio_is_zero() {
        let features = derive(&record(json!({ "bu": 55, "sc": 0 })));
        assert_eq!(features.value("bun_sc_ratio"), 0.0);
        assert_eq!(features.value("high_creatinine"), 0.0);
    }

    #[test]
    fn test_high_creatinine_threshold_is_strict() {
        let at = derive(&record(json!({ "sc": 1.2 })));
        let above = derive(&record(json!({ "sc": 1.21 })));
        assert_eq!(at.value("high_creatinine"), 0.0);
        assert_eq!(above.value("high_creatinine"), 1.0);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let r = record(json!({
            "age": 48, "bp": 80, "sc": 1.2, "bu": 36, "hemo": 15.4, "htn": "yes",
        }));
        assert_eq!(derive(&r), derive(&r));
    }

    #[test]
    fn test_reconcile_fills_orders_and_drops() {
        let vector = FeatureVector::from_pairs([("c", 3.0), ("a", 1.0), ("z", 9.0)]);
        let reconciled = vector.reconcile(&["a", "b", "c"]);
        assert_eq!(reconciled, vec![1.0, 0.0, 3.0]);
    }
}
