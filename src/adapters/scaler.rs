//! Standard scaler exported next to each model.

use serde::{Deserialize, Serialize};

use crate::ports::PredictorError;

/// Per-feature standardisation: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Scaler that leaves `n` features untouched.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Check internal consistency against the model's feature count.
    ///
    /// # Errors
    /// Returns a description of the mismatch.
    pub fn check(&self, n_features: usize) -> Result<(), String> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(format!(
                "scaler has {} means and {} scales for {} features",
                self.mean.len(),
                self.scale.len(),
                n_features
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".into());
        }
        Ok(())
    }

    /// Standardise a vector in the fitted feature order.
    ///
    /// Zero-variance features (scale 0) are only centred.
    ///
    /// # Errors
    /// Returns `PredictorError::FeatureMismatch` on length mismatch and
    /// `PredictorError::Transform` if the output is not finite.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictorError> {
        if features.len() != self.len() {
            return Err(PredictorError::FeatureMismatch {
                expected: self.len(),
                actual: features.len(),
            });
        }

        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(i, (x, (mean, scale)))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                let z = (x - mean) / scale;
                if z.is_finite() {
                    Ok(z)
                } else {
                    Err(PredictorError::Transform(format!(
                        "feature {i} scaled to a non-finite value"
                    )))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler {
            mean: vec![50.0, 1.0],
            scale: vec![10.0, 0.0],
        };
        let z = scaler.transform(&[60.0, 3.0]).expect("Should scale");
        assert_eq!(z, vec![1.0, 2.0]);
    }

    #[test]
    fn test_transform_length_mismatch() {
        let scaler = StandardScaler::identity(3);
        let err = scaler.transform(&[1.0]).expect_err("Should reject");
        assert_eq!(
            err,
            PredictorError::FeatureMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_check() {
        assert!(StandardScaler::identity(2).check(2).is_ok());
        assert!(StandardScaler::identity(2).check(3).is_err());
        let bad = StandardScaler {
            mean: vec![f64::NAN],
            scale: vec![1.0],
        };
        assert!(bad.check(1).is_err());
    }
}
