//! Linear adapter: logistic regression exported as JSON.
//!
//! The export carries the feature schema the model was trained on, the
//! fitted scaler, coefficients and intercept. Probability is the logistic
//! of the linear score.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use super::store::ModelStoreError;
use crate::ports::{Predictor, PredictorError, RawPrediction};

/// Name used when the export does not declare one.
pub const DEFAULT_LINEAR_NAME: &str = "logistic_regression";

/// Model parameters exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedLinearModel {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub scaler: StandardScaler,
    /// Probabilities strictly above this are labelled CKD
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_name() -> String {
    DEFAULT_LINEAR_NAME.to_string()
}

fn default_threshold() -> f64 {
    0.5
}

impl ExportedLinearModel {
    fn check(&self) -> Result<(), ModelStoreError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(ModelStoreError::Invalid("linear model declares no features".into()));
        }
        if self.coefficients.len() != n {
            return Err(ModelStoreError::Invalid(format!(
                "linear model has {} coefficients for {} features",
                self.coefficients.len(),
                n
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelStoreError::Invalid("linear model parameters must be finite".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelStoreError::Invalid(format!(
                "decision threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        self.scaler.check(n).map_err(ModelStoreError::Invalid)
    }
}

/// Logistic regression predictor.
///
/// Starts empty; `load_bytes` makes it ready. An empty adapter reports
/// itself unavailable so the controller skips its tier.
pub struct LinearModel {
    name: String,
    model: Option<ExportedLinearModel>,
}

impl LinearModel {
    /// Create an adapter with no parameters loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: DEFAULT_LINEAR_NAME.to_string(),
            model: None,
        }
    }

    /// Create a ready adapter from in-memory parameters.
    ///
    /// # Errors
    /// Returns `ModelStoreError::Invalid` if the parameters are inconsistent.
    pub fn from_export(model: ExportedLinearModel) -> Result<Self, ModelStoreError> {
        model.check()?;
        Ok(Self {
            name: model.name.clone(),
            model: Some(model),
        })
    }

    /// Load parameters from the bytes of an exported JSON artifact.
    ///
    /// `path` is only used for logging; the caller reads (and verifies)
    /// the file once and passes the same buffer here.
    ///
    /// # Errors
    /// Returns error if the bytes cannot be parsed or validated.
    pub fn load_bytes(&mut self, bytes: &[u8], path: &Path) -> Result<(), ModelStoreError> {
        let model: ExportedLinearModel = serde_json::from_slice(bytes)?;
        model.check()?;

        tracing::info!(
            "Loaded linear model {:?} from {:?} (n_features={})",
            model.name,
            path,
            model.feature_names.len()
        );

        self.name = model.name.clone();
        self.model = Some(model);
        Ok(())
    }

    fn model(&self) -> Result<&ExportedLinearModel, PredictorError> {
        self.model
            .as_ref()
            .ok_or_else(|| PredictorError::NotLoaded(self.name.clone()))
    }
}

impl Default for LinearModel {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Predictor for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    fn expected_features(&self) -> &[String] {
        match &self.model {
            Some(model) => &model.feature_names,
            None => &[],
        }
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictorError> {
        self.model()?.scaler.transform(features)
    }

    fn predict(&self, scaled: &[f64]) -> Result<RawPrediction, PredictorError> {
        let model = self.model()?;
        if scaled.len() != model.coefficients.len() {
            return Err(PredictorError::FeatureMismatch {
                expected: model.coefficients.len(),
                actual: scaled.len(),
            });
        }

        let score: f64 = model.intercept
            + model
                .coefficients
                .iter()
                .zip(scaled)
                .map(|(c, x)| c * x)
                .sum::<f64>();
        let probability = sigmoid(score);

        tracing::debug!("Linear score={:.4}, probability={:.4}", score, probability);

        RawPrediction {
            label: u8::from(probability > model.threshold),
            probability,
        }
        .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(feature_names: &[&str], coefficients: Vec<f64>, intercept: f64) -> ExportedLinearModel {
        ExportedLinearModel {
            name: "test_linear".into(),
            feature_names: feature_names.iter().map(|s| (*s).to_string()).collect(),
            scaler: StandardScaler::identity(coefficients.len()),
            coefficients,
            intercept,
            threshold: 0.5,
        }
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_empty_adapter_is_unavailable() {
        let model = LinearModel::new();
        assert!(!model.is_ready());
        assert!(model.expected_features().is_empty());
        assert!(matches!(model.predict(&[]), Err(PredictorError::NotLoaded(_))));
    }

    #[test]
    fn test_predict() {
        let model = LinearModel::from_export(export(&["sc", "hemo"], vec![2.0, -0.5], -1.0))
            .expect("Valid export");
        assert!(model.is_ready());
        assert_eq!(model.name(), "test_linear");

        // score = -1 + 2*2 - 0.5*2 = 2
        let scaled = model.transform(&[2.0, 2.0]).expect("Should scale");
        let out = model.predict(&scaled).expect("Should predict");
        assert!((out.probability - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(out.label, 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        // Zero score gives exactly 0.5.
        let model = LinearModel::from_export(export(&["sc"], vec![1.0], 0.0)).expect("Valid export");
        let out = model.predict(&[0.0]).expect("Should predict");
        assert!((out.probability - 0.5).abs() < f64::EPSILON);
        assert_eq!(out.label, 0);
    }

    #[test]
    fn test_rejects_inconsistent_export() {
        let mut bad = export(&["sc", "hemo"], vec![1.0], 0.0);
        bad.scaler = StandardScaler::identity(1);
        assert!(LinearModel::from_export(bad).is_err());
    }

    #[test]
    fn test_load_bytes() {
        let bytes = serde_json::to_vec(&export(&["age"], vec![0.1], 0.0)).expect("serialize");

        let mut model = LinearModel::new();
        model
            .load_bytes(&bytes, Path::new("linear_model.json"))
            .expect("Should load");
        assert!(model.is_ready());
        assert_eq!(model.expected_features(), &["age".to_string()]);
    }
}
