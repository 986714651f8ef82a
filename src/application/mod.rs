//! Application layer: Use cases and services.
//!
//! This module wires the domain rules and the predictor port into the
//! assessment pipeline: feature derivation, tiered inference, explanation
//! and the flat response returned to callers.

mod assessment;
mod explain;
mod fallback;
mod inference;

pub use assessment::AssessmentService;
pub use explain::{
    ExplainError, ExplainabilitySynthesizer, Explainer, BASE_VALUE, MAX_LOCAL_FACTORS, PDP_POINTS,
};
pub use fallback::{ClinicalFallbackScorer, LABEL_THRESHOLD, MAX_SCORE};
pub use inference::{InferenceContext, TieredInference};
