//! # NephroCare
//!
//! Chronic kidney disease risk assessment from a routine lab panel.
//!
//! This crate provides:
//! - Feature derivation from raw clinical records
//! - Tiered inference: tree ensemble, then logistic regression, then a
//!   deterministic clinical rule engine that always answers
//! - Risk banding and an explanation bundle for each prediction
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (ClinicalRecord, FeatureVector, PredictionResult)
//! - `ports`: The `Predictor` trait implemented by statistical models
//! - `adapters`: Exported model loaders and the log sanitizer
//! - `application`: Inference controller, fallback, explanation, assessment
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{AssessmentService, TieredInference};
pub use domain::{AssessmentResponse, ClinicalRecord, PredictionResult, RiskLevel};

/// Result type for NephroCare operations
pub type Result<T> = std::result::Result<T, NephroError>;

/// Main error type for NephroCare
#[derive(Debug, thiserror::Error)]
pub enum NephroError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal consistency error: {0}")]
    Consistency(String),

    #[error("Model store error: {0}")]
    ModelStore(#[from] adapters::ModelStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
