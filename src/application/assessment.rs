//! Assessment service: the request boundary.
//!
//! Turns a raw JSON record into a flat [`AssessmentResponse`]. Malformed
//! requests and internal consistency violations become `success: false`
//! responses; an explanation failure only drops the explanation.

use std::sync::Arc;

use super::explain::{ExplainabilitySynthesizer, Explainer};
use super::fallback::ClinicalFallbackScorer;
use super::inference::TieredInference;
use crate::domain::{derive, AssessmentResponse, ClinicalRecord, FeatureVector, PredictionResult};
use crate::NephroError;

/// Service answering CKD risk assessment requests.
#[derive(Clone)]
pub struct AssessmentService {
    inference: TieredInference,
    explainer: Arc<dyn Explainer>,
    include_explanation: bool,
}

impl AssessmentService {
    #[must_use]
    pub fn new(inference: TieredInference) -> Self {
        Self {
            inference,
            explainer: Arc::new(ExplainabilitySynthesizer::new()),
            include_explanation: true,
        }
    }

    /// Enable or disable the explanation bundle.
    #[must_use]
    pub fn with_explanation(mut self, include: bool) -> Self {
        self.include_explanation = include;
        self
    }

    /// Replace the explanation step.
    #[must_use]
    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = explainer;
        self
    }

    /// Assess a raw request string.
    #[must_use]
    pub fn assess_str(&self, input: &str) -> AssessmentResponse {
        match serde_json::from_str::<serde_json::Value>(input) {
            Ok(body) => self.assess(&body),
            Err(e) => {
                tracing::warn!("Request is not valid JSON: {e}");
                AssessmentResponse::failure(NephroError::from(e).to_string())
            }
        }
    }

    /// Assess a JSON request body.
    #[must_use]
    pub fn assess(&self, body: &serde_json::Value) -> AssessmentResponse {
        match ClinicalRecord::from_json(body) {
            Ok(record) => self.assess_record(&record),
            Err(e) => {
                tracing::warn!("Rejected request: {e}");
                AssessmentResponse::failure(e.to_string())
            }
        }
    }

    /// Assess an already parsed record.
    #[must_use]
    pub fn assess_record(&self, record: &ClinicalRecord) -> AssessmentResponse {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            tracing::debug!("Record missing {} field(s): {:?}", missing.len(), missing);
        }

        let features = derive(record);
        let result = self.inference.infer(&features);
        self.respond(record, &features, &result)
            .unwrap_or_else(|e| {
                tracing::error!("Assessment failed: {e}");
                AssessmentResponse::failure(e.to_string())
            })
    }

    /// Build the response for a finished prediction.
    pub(crate) fn respond(
        &self,
        record: &ClinicalRecord,
        features: &FeatureVector,
        result: &PredictionResult,
    ) -> Result<AssessmentResponse, NephroError> {
        result.check().map_err(NephroError::Consistency)?;

        let factors = self.inference.fallback().primary_factors(features);
        let reasoning = ClinicalFallbackScorer::reasoning(&factors);
        let mut response = AssessmentResponse::from_prediction(result, reasoning, factors);

        if self.include_explanation {
            match self
                .explainer
                .explain(record, result.probability, result.label)
            {
                Ok(bundle) => response.explanation = Some(bundle),
                Err(e) => {
                    tracing::warn!("Explanation unavailable: {e}");
                    response.explanation_error = Some(e.to_string());
                }
            }
        }

        tracing::info!(
            "Assessment complete: {} (p={:.3}) via {}",
            result.risk_level,
            result.probability,
            result.model_used
        );
        Ok(response)
    }
}

impl std::fmt::Debug for AssessmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentService")
            .field("inference", &self.inference)
            .field("include_explanation", &self.include_explanation)
            .finish_non_exhaustive()
    }
}
