//! Flat response object returned across the request boundary.

use serde::{Deserialize, Serialize};

use super::explanation::ExplanationBundle;
use super::risk::PredictionResult;

/// Risk label reported when no prediction could be produced.
pub const UNKNOWN_RISK: &str = "Unknown";

/// Badge reported when no prediction could be produced.
pub const UNKNOWN_BADGE: &str = "secondary";

/// Result of one assessment request.
///
/// Every field is always present; failures carry safe defaults and an
/// `error` message instead of omitting data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub success: bool,

    /// Binary prediction (0 = no CKD, 1 = CKD)
    pub prediction: u8,

    pub probability: f64,

    pub no_ckd_probability: f64,

    /// "Low", "Moderate", "High", "Very High" or "Unknown"
    pub risk_level: String,

    /// "Low Risk", ... or "Unknown"
    pub risk_label: String,

    pub risk_color: String,

    /// Clinical guidance for the risk band, empty on failure
    pub risk_description: String,

    /// Tier that answered, empty on failure
    pub model_used: String,

    pub reasoning: String,

    pub primary_factors: Vec<String>,

    pub explanation: Option<ExplanationBundle>,

    pub explanation_error: Option<String>,

    pub error: Option<String>,

    pub assessed_at: chrono::DateTime<chrono::Utc>,
}

impl AssessmentResponse {
    /// Successful response for a prediction.
    #[must_use]
    pub fn from_prediction(result: &PredictionResult, reasoning: String, primary_factors: Vec<String>) -> Self {
        Self {
            success: true,
            prediction: result.label,
            probability: result.probability,
            no_ckd_probability: result.no_ckd_probability,
            risk_level: result.risk_level.to_string(),
            risk_label: result.risk_level.label().to_string(),
            risk_color: result.risk_level.badge().to_string(),
            risk_description: result.risk_level.description().to_string(),
            model_used: result.model_used.clone(),
            reasoning,
            primary_factors,
            explanation: None,
            explanation_error: None,
            error: None,
            assessed_at: chrono::Utc::now(),
        }
    }

    /// Failure response with safe defaults.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            prediction: 0,
            probability: 0.0,
            no_ckd_probability: 1.0,
            risk_level: UNKNOWN_RISK.to_string(),
            risk_label: UNKNOWN_RISK.to_string(),
            risk_color: UNKNOWN_BADGE.to_string(),
            risk_description: String::new(),
            model_used: String::new(),
            reasoning: String::new(),
            primary_factors: Vec::new(),
            explanation: None,
            explanation_error: None,
            error: Some(error.into()),
            assessed_at: chrono::Utc::now(),
        }
    }
}
