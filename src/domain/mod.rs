//! Domain layer: Core clinical types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! All types are serializable; nothing here can fail on malformed input.

mod explanation;
pub mod features;
mod record;
mod response;
mod risk;

pub use explanation::{Attribution, ExplanationBundle, Impact, LocalFactor, PartialDependence};
pub use features::{derive, FeatureVector, FEATURE_NAMES, HIGH_CREATININE_MG_DL};
pub use record::{ClinicalRecord, FieldValue, RECORD_FIELDS};
pub use response::{AssessmentResponse, UNKNOWN_BADGE, UNKNOWN_RISK};
pub use risk::{PredictionResult, RiskLevel, CLINICAL_FALLBACK_ID};
