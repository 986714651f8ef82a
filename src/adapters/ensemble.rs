//! Ensemble adapter: averaged decision trees exported as JSON.
//!
//! Each tree is a flat node array rooted at index 0. Split nodes send a
//! sample left when `x[feature] <= threshold`; leaves hold the positive
//! class probability. The ensemble probability is the mean over trees.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use super::store::ModelStoreError;
use crate::ports::{Predictor, PredictorError, RawPrediction};

/// Name used when the export does not declare one.
pub const DEFAULT_ENSEMBLE_NAME: &str = "random_forest";

/// One node of an exported tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single exported decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTree {
    pub nodes: Vec<TreeNode>,
}

impl ExportedTree {
    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {i} splits on unknown feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    // Children must come after their parent, which rules out cycles.
                    if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {i} has out-of-order children"));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !(0.0..=1.0).contains(value) {
                        return Err(format!("leaf {i} probability {value} outside [0, 1]"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the tree for one sample.
    fn evaluate(&self, x: &[f64]) -> Result<f64, PredictorError> {
        let mut index = 0;
        // Each step moves strictly forward, so the walk ends within nodes.len() steps.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x.get(*feature).ok_or_else(|| {
                        PredictorError::Prediction(format!("missing feature index {feature}"))
                    })?;
                    index = if v <= threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictorError::Prediction(format!(
                        "node index {index} out of range"
                    )))
                }
            }
        }
        Err(PredictorError::Prediction("tree walk did not reach a leaf".into()))
    }
}

/// Model parameters exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEnsemble {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub trees: Vec<ExportedTree>,
}

fn default_name() -> String {
    DEFAULT_ENSEMBLE_NAME.to_string()
}

impl ExportedEnsemble {
    fn check(&self) -> Result<(), ModelStoreError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(ModelStoreError::Invalid("ensemble declares no features".into()));
        }
        if self.trees.is_empty() {
            return Err(ModelStoreError::Invalid("ensemble has no trees".into()));
        }
        self.scaler.check(n).map_err(ModelStoreError::Invalid)?;
        for (t, tree) in self.trees.iter().enumerate() {
            tree.check(n)
                .map_err(|e| ModelStoreError::Invalid(format!("tree {t}: {e}")))?;
        }
        Ok(())
    }
}

/// Tree ensemble predictor.
pub struct EnsembleModel {
    name: String,
    model: Option<ExportedEnsemble>,
}

impl EnsembleModel {
    /// Create an adapter with no parameters loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: DEFAULT_ENSEMBLE_NAME.to_string(),
            model: None,
        }
    }

    /// Create a ready adapter from in-memory parameters.
    ///
    /// # Errors
    /// Returns `ModelStoreError::Invalid` if any tree is malformed.
    pub fn from_export(model: ExportedEnsemble) -> Result<Self, ModelStoreError> {
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
        let model: ExportedEnsemble = serde_json::from_slice(bytes)?;
        model.check()?;

        tracing::info!(
            "Loaded ensemble {:?} from {:?} (n_trees={}, n_features={})",
            model.name,
            path,
            model.trees.len(),
            model.feature_names.len()
        );

        self.name = model.name.clone();
        self.model = Some(model);
        Ok(())
    }

    fn model(&self) -> Result<&ExportedEnsemble, PredictorError> {
        self.model
            .as_ref()
            .ok_or_else(|| PredictorError::NotLoaded(self.name.clone()))
    }
}

impl Default for EnsembleModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for EnsembleModel {
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
        if scaled.len() != model.feature_names.len() {
            return Err(PredictorError::FeatureMismatch {
                expected: model.feature_names.len(),
                actual: scaled.len(),
            });
        }

        let mut total = 0.0;
        for tree in &model.trees {
            total += tree.evaluate(scaled)?;
        }
        let probability = total / model.trees.len() as f64;

        tracing::debug!(
            "Ensemble probability={:.4} over {} trees",
            probability,
            model.trees.len()
        );

        RawPrediction {
            label: u8::from(probability > 0.5),
            probability,
        }
        .validated()
    }
}
