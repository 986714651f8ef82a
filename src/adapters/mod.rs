//! Adapters layer: Concrete implementations of ports.
//!
//! - `ensemble`: averaged decision trees (primary tier)
//! - `linear`: logistic regression (secondary tier)
//! - `scaler`: standard scaling fitted alongside each model
//! - `store`: model directory loading and manifest verification
//! - `sanitize`: patient identifier filtering for logs

pub mod ensemble;
pub mod linear;
pub mod sanitize;
pub mod scaler;
pub mod store;

pub use store::{ModelStore, ModelStoreError};
