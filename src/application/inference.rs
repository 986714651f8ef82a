//! Tiered inference: ensemble, then linear, then clinical rules.
//!
//! Each statistical tier is attempted in order and the first one that
//! answers wins. Tiers that are not loaded or that fail are logged and
//! skipped. The clinical rule engine is always the last tier, so `infer`
//! never fails.

use std::sync::Arc;

use super::fallback::ClinicalFallbackScorer;
use crate::adapters::ModelStore;
use crate::domain::{FeatureVector, PredictionResult, CLINICAL_FALLBACK_ID};
use crate::ports::{Predictor, PredictorOutcome, RawPrediction};

/// Read-only set of predictors shared by every request.
#[derive(Clone, Default)]
pub struct InferenceContext {
    predictors: Arc<Vec<Arc<dyn Predictor>>>,
}

impl InferenceContext {
    /// Predictors in priority order.
    #[must_use]
    pub fn new(predictors: Vec<Arc<dyn Predictor>>) -> Self {
        Self {
            predictors: Arc::new(predictors),
        }
    }

    /// Context holding the tiers of a loaded model store.
    #[must_use]
    pub fn from_store(store: &ModelStore) -> Self {
        Self::new(store.predictors())
    }

    #[must_use]
    pub fn predictors(&self) -> &[Arc<dyn Predictor>] {
        &self.predictors
    }

    /// Number of tiers with parameters resident.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.predictors.iter().filter(|p| p.is_ready()).count()
    }
}

impl std::fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.predictors.iter().map(|p| p.name()))
            .finish()
    }
}

/// Controller running the tier chain for one feature vector at a time.
#[derive(Debug, Clone, Default)]
pub struct TieredInference {
    context: InferenceContext,
    fallback: ClinicalFallbackScorer,
}

impl TieredInference {
    #[must_use]
    pub fn new(context: InferenceContext) -> Self {
        Self {
            context,
            fallback: ClinicalFallbackScorer::new(),
        }
    }

    /// Controller with no statistical tiers; every request uses the rules.
    #[must_use]
    pub fn without_models() -> Self {
        Self::new(InferenceContext::default())
    }

    #[must_use]
    pub fn fallback(&self) -> &ClinicalFallbackScorer {
        &self.fallback
    }

    /// Run one statistical tier.
    ///
    /// The feature vector is reconciled against the predictor's own schema
    /// before scaling.
    #[must_use]
    pub fn attempt(predictor: &dyn Predictor, features: &FeatureVector) -> PredictorOutcome {
        if !predictor.is_ready() {
            return PredictorOutcome::Unavailable;
        }

        let aligned = features.reconcile(predictor.expected_features());
        let result = predictor
            .transform(&aligned)
            .and_then(|scaled| predictor.predict(&scaled))
            .and_then(RawPrediction::validated);

        match result {
            Ok(raw) => PredictorOutcome::Success(raw),
            Err(e) => PredictorOutcome::Failed(e.to_string()),
        }
    }

    /// Produce a prediction. Never fails; the clinical rules answer when no
    /// statistical tier does.
    #[must_use]
    pub fn infer(&self, features: &FeatureVector) -> PredictionResult {
        let answered = self.context.predictors().iter().find_map(|predictor| {
            match Self::attempt(predictor.as_ref(), features) {
                PredictorOutcome::Success(raw) => Some((predictor.name(), raw)),
                PredictorOutcome::Unavailable => {
                    tracing::warn!("{} unavailable, trying next tier", predictor.name());
                    None
                }
                PredictorOutcome::Failed(reason) => {
                    tracing::warn!("{} failed: {reason}; trying next tier", predictor.name());
                    None
                }
            }
        });

        if let Some((name, raw)) = answered {
            tracing::info!("Prediction by {name}: probability={:.3}", raw.probability);
            return PredictionResult::new(raw.label, raw.probability, name);
        }

        let score = self.fallback.score_features(features);
        tracing::info!("Prediction by clinical rules: score={score:.3}");
        PredictionResult::new(
            ClinicalFallbackScorer::label(score),
            score,
            CLINICAL_FALLBACK_ID,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{derive, ClinicalRecord, RiskLevel};
    use crate::ports::PredictorError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Predictor returning a fixed answer and recording what it was fed.
    struct MockPredictor {
        name: String,
        ready: bool,
        features: Vec<String>,
        answer: Result<RawPrediction, PredictorError>,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl MockPredictor {
        fn answering(name: &str, probability: f64) -> Self {
            Self {
                name: name.into(),
                ready: true,
                features: vec!["sc".into(), "age".into()],
                answer: Ok(RawPrediction {
                    label: u8::from(probability > 0.5),
                    probability,
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                answer: Err(PredictorError::Prediction("boom".into())),
                ..Self::answering(name, 0.0)
            }
        }

        fn unloaded(name: &str) -> Self {
            Self {
                ready: false,
                ..Self::answering(name, 0.0)
            }
        }
    }

    impl Predictor for MockPredictor {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn expected_features(&self) -> &[String] {
            &self.features
        }

        fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictorError> {
            self.seen.lock().expect("lock").push(features.to_vec());
            Ok(features.to_vec())
        }

        fn predict(&self, _scaled: &[f64]) -> Result<RawPrediction, PredictorError> {
            self.answer.clone()
        }
    }

    fn features() -> FeatureVector {
        let record = ClinicalRecord::from_json(&json!({
            "age": 50, "bp": 140, "sc": 2.0, "hemo": 11, "bu": 35,
            "htn": "yes", "dm": "no", "pe": "no", "ane": "no",
        }))
        .expect("Should parse record");
        derive(&record)
    }

    fn controller(predictors: Vec<Arc<dyn Predictor>>) -> TieredInference {
        TieredInference::new(InferenceContext::new(predictors))
    }

    #[test]
    fn test_no_models_uses_clinical_rules() {
        let result = TieredInference::without_models().infer(&features());
        assert_eq!(result.model_used, CLINICAL_FALLBACK_ID);
        assert!((result.probability - 0.67).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.label, 1);
    }

    #[test]
    fn test_primary_answers_first() {
        let result = controller(vec![
            Arc::new(MockPredictor::answering("primary", 0.2)),
            Arc::new(MockPredictor::answering("secondary", 0.9)),
        ])
        .infer(&features());
        assert_eq!(result.model_used, "primary");
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_failed_primary_advances_to_secondary() {
        let result = controller(vec![
            Arc::new(MockPredictor::failing("primary")),
            Arc::new(MockPredictor::answering("secondary", 0.9)),
        ])
        .infer(&features());
        assert_eq!(result.model_used, "secondary");
        assert_eq!(result.risk_level, RiskLevel::VeryHigh);
    }

    #[test]
    fn test_unavailable_tiers_are_skipped() {
        let primary = Arc::new(MockPredictor::unloaded("primary"));
        let result = controller(vec![
            primary.clone(),
            Arc::new(MockPredictor::unloaded("secondary")),
        ])
        .infer(&features());

        assert!(result.is_fallback());
        assert!(primary.seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_out_of_range_probability_is_a_failure() {
        let bogus = MockPredictor {
            answer: Ok(RawPrediction {
                label: 1,
                probability: 1.7,
            }),
            ..MockPredictor::answering("bogus", 0.0)
        };
        assert!(matches!(
            TieredInference::attempt(&bogus, &features()),
            PredictorOutcome::Failed(_)
        ));

        let result = controller(vec![Arc::new(bogus)]).infer(&features());
        assert!(result.is_fallback());
    }

    #[test]
    fn test_features_reconciled_to_predictor_schema() {
        let mock = Arc::new(MockPredictor {
            features: vec!["a".into(), "b".into(), "c".into()],
            ..MockPredictor::answering("schema", 0.4)
        });
        let vector = FeatureVector::from_pairs([("c", 3.0), ("a", 1.0), ("z", 9.0)]);

        controller(vec![mock.clone()]).infer(&vector);

        let seen = mock.seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[vec![1.0, 0.0, 3.0]]);
    }

    #[test]
    fn test_context_ready_count() {
        let context = InferenceContext::new(vec![
            Arc::new(MockPredictor::unloaded("a")),
            Arc::new(MockPredictor::answering("b", 0.1)),
        ]);
        assert_eq!(context.ready_count(), 1);
        assert_eq!(format!("{context:?}"), r#"["a", "b"]"#);
    }
}
