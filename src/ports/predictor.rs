//! Predictor port: Trait for statistical CKD models.
//!
//! This trait abstracts the exported models (linear, tree ensemble) from the
//! tiered inference controller. Implementations are read-only after loading
//! and shared across requests.

/// Errors a predictor can raise while scaling or predicting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictorError {
    #[error("Model not loaded: {0}")]
    NotLoaded(String),

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Scaling failed: {0}")]
    Transform(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

/// Label and probability returned by a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    /// 0 = no CKD, 1 = CKD
    pub label: u8,
    /// Probability of the positive class
    pub probability: f64,
}

impl RawPrediction {
    /// Validate model output before it is trusted.
    ///
    /// # Errors
    /// Returns `PredictorError::Prediction` for non-finite or out-of-range
    /// probabilities and non-binary labels.
    pub fn validated(self) -> Result<Self, PredictorError> {
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(PredictorError::Prediction(format!(
                "probability {} outside [0, 1]",
                self.probability
            )));
        }
        if self.label > 1 {
            return Err(PredictorError::Prediction(format!(
                "label {} is not binary",
                self.label
            )));
        }
        Ok(self)
    }
}

/// Result of attempting one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictorOutcome {
    /// The model answered
    Success(RawPrediction),
    /// The model is not loaded
    Unavailable,
    /// Scaling or prediction raised
    Failed(String),
}

/// Trait for statistical predictors.
///
/// Implementations provide:
/// - The feature names (and order) the model was trained on
/// - The scaling transform fitted alongside the model
/// - Prediction on the scaled vector
pub trait Predictor: Send + Sync {
    /// Stable identifier reported as `model_used`.
    fn name(&self) -> &str;

    /// Whether the model parameters are resident.
    fn is_ready(&self) -> bool {
        true
    }

    /// Feature names in the order `transform` expects them.
    fn expected_features(&self) -> &[String];

    /// Apply the model's scaling to a vector already in expected order.
    ///
    /// # Errors
    /// Returns `PredictorError::FeatureMismatch` or `PredictorError::Transform`.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictorError>;

    /// Predict on a scaled vector.
    ///
    /// # Errors
    /// Returns `PredictorError::Prediction` if the model cannot score the input.
    fn predict(&self, scaled: &[f64]) -> Result<RawPrediction, PredictorError>;
}
