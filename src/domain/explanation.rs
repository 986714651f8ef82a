//! Explanation bundle types (SHAP-like attributions, partial dependence,
//! LIME-like local explanation).

use serde::{Deserialize, Serialize};

/// Signed contribution of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub feature: String,
    /// Positive raises risk, negative is risk-reducing evidence
    pub weight: f64,
}

/// Illustrative response curve for one feature.
///
/// Curves are fixed per-feature approximations of clinical relationships.
/// They are not computed from the live model and carry no causal meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDependence {
    pub feature: String,
    pub x_values: Vec<f64>,
    /// Clipped to [0, 1]
    pub y_values: Vec<f64>,
}

/// Qualitative impact of a locally relevant feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moderate => write!(f, "Moderate Risk"),
            Self::High => write!(f, "High Risk"),
        }
    }
}

/// One entry of the ranked local explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalFactor {
    pub feature: String,
    /// Observed value with unit ("2.4 mg/dL", "Present")
    pub value: String,
    pub impact: Impact,
    pub weight: f64,
    pub explanation: String,
}

/// Everything the result page needs to explain one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationBundle {
    /// Per-feature signed weights, in the documented feature order
    pub attributions: Vec<Attribution>,

    /// Reference risk before any feature contribution
    pub base_value: f64,

    /// `base_value` plus the sum of all weights
    pub attribution_total: f64,

    pub partial_dependence: Vec<PartialDependence>,

    /// At most five entries, descending weight
    pub local_explanation: Vec<LocalFactor>,

    /// Probability the bundle explains
    pub probability: f64,

    /// Label the bundle explains
    pub label: u8,
}

impl ExplanationBundle {
    /// Attribution weight of a feature by display name.
    #[must_use]
    pub fn weight_of(&self, feature: &str) -> Option<f64> {
        self.attributions
            .iter()
            .find(|a| a.feature == feature)
            .map(|a| a.weight)
    }
}
