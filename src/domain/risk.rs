//! Risk classification and prediction result types.
//!
//! Represents the output of the tiered CKD risk inference.

use serde::{Deserialize, Serialize};

/// Identifier recorded in `model_used` when the clinical rule engine answered.
pub const CLINICAL_FALLBACK_ID: &str = "clinical_rules";

/// Ordinal risk level for chronic kidney disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Probability in [0, 0.3)
    Low,
    /// Probability in [0.3, 0.6)
    Moderate,
    /// Probability in [0.6, 0.85)
    High,
    /// Probability in [0.85, 1.0]
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskLevel {
    /// Lower edge of the Moderate band.
    pub const MODERATE_FROM: f64 = 0.3;
    /// Lower edge of the High band.
    pub const HIGH_FROM: f64 = 0.6;
    /// Lower edge of the Very High band.
    pub const VERY_HIGH_FROM: f64 = 0.85;

    /// Map a probability to its band. Lower edges are inclusive.
    #[must_use]
    pub fn classify(probability: f64) -> Self {
        if probability < Self::MODERATE_FROM {
            Self::Low
        } else if probability < Self::HIGH_FROM {
            Self::Moderate
        } else if probability < Self::VERY_HIGH_FROM {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Label shown to clinicians ("High Risk").
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
            Self::VeryHigh => "Very High Risk",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - Kidney markers largely within normal ranges",
            Self::Moderate => "Moderate risk - Repeat labs and monitor blood pressure",
            Self::High => "High risk - Nephrology referral recommended",
            Self::VeryHigh => "Very high risk - Prompt nephrology consultation advised",
        }
    }

    /// Badge class used by the result card.
    #[must_use]
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Low => "success",
            Self::Moderate => "warning",
            Self::High | Self::VeryHigh => "danger",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
            Self::VeryHigh => write!(f, "Very High"),
        }
    }
}

/// Outcome of one inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Binary prediction (0 = no CKD, 1 = CKD)
    pub label: u8,

    /// Probability of CKD (0.0 to 1.0)
    pub probability: f64,

    /// Always `1 - probability`
    pub no_ckd_probability: f64,

    /// Risk band of `probability`
    pub risk_level: RiskLevel,

    /// Which tier produced the result
    pub model_used: String,
}

impl PredictionResult {
    /// Create a result; the risk band and complement are derived here.
    #[must_use]
    pub fn new(label: u8, probability: f64, model_used: impl Into<String>) -> Self {
        Self {
            label,
            probability,
            no_ckd_probability: 1.0 - probability,
            risk_level: RiskLevel::classify(probability),
            model_used: model_used.into(),
        }
    }

    /// Whether the clinical rule engine produced this result.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.model_used == CLINICAL_FALLBACK_ID
    }

    /// Check the invariants every result must satisfy.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn check(&self) -> Result<(), String> {
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(format!("probability {} outside [0, 1]", self.probability));
        }
        if self.label > 1 {
            return Err(format!("label {} is not binary", self.label));
        }
        if self.risk_level != RiskLevel::classify(self.probability) {
            return Err(format!(
                "risk level {} does not match probability {}",
                self.risk_level, self.probability
            ));
        }
        Ok(())
    }
}
