//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the inference core and the statistical models it consumes.

mod predictor;

pub use predictor::{Predictor, PredictorError, PredictorOutcome, RawPrediction};
