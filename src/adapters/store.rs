//! Model store: loads exported predictors from a model directory.
//!
//! Layout:
//! - `ensemble_model.json` (primary tier)
//! - `linear_model.json` (secondary tier)
//! - `manifest.json` (optional) mapping file names to SHA-256 hex digests
//!
//! # Integrity
//!
//! When a manifest is present, every file it lists must hash to the recorded
//! digest or that artifact is rejected. With `require_manifest`, artifacts the
//! manifest does not bind are rejected too.
//!
//! A rejected or missing artifact never aborts loading: its adapter stays
//! empty and the inference controller reports that tier as unavailable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ensemble::EnsembleModel;
use super::linear::LinearModel;
use crate::ports::Predictor;

/// File name of the primary (ensemble) artifact.
pub const ENSEMBLE_FILE: &str = "ensemble_model.json";

/// File name of the secondary (linear) artifact.
pub const LINEAR_FILE: &str = "linear_model.json";

/// File name of the integrity manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors raised while loading model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model parameters: {0}")]
    Invalid(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),

    #[error("{0} is not bound by the manifest")]
    Unbound(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    fn read(path: &Path) -> Result<Self, ModelStoreError> {
        let content = std::fs::read(path)
            .map_err(|e| ModelStoreError::Manifest(format!("Failed to read manifest: {e}")))?;
        let manifest: ModelManifest = serde_json::from_slice(&content)
            .map_err(|e| ModelStoreError::Manifest(format!("Invalid manifest format: {e}")))?;
        if manifest.version != 1 {
            return Err(ModelStoreError::Manifest(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Verify the bytes of one artifact against the manifest.
    fn verify(&self, file: &str, bytes: &[u8], require_binding: bool) -> Result<(), ModelStoreError> {
        let Some(expected_hex) = self.files.get(file) else {
            if require_binding {
                return Err(ModelStoreError::Unbound(file.to_string()));
            }
            tracing::warn!("{file} is not listed in the manifest; loading unverified");
            return Ok(());
        };

        let actual_hex = sha256_hex(bytes);
        if !constant_time_eq_str(&actual_hex, &expected_hex.to_ascii_lowercase()) {
            return Err(ModelStoreError::HashMismatch(file.to_string()));
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Predictors loaded from a model directory, in tier order.
pub struct ModelStore {
    ensemble: Arc<EnsembleModel>,
    linear: Arc<LinearModel>,
}

impl ModelStore {
    /// A store with no artifacts: both tiers unavailable.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ensemble: Arc::new(EnsembleModel::new()),
            linear: Arc::new(LinearModel::new()),
        }
    }

    /// Load whatever artifacts `dir` provides.
    ///
    /// Each artifact is read once; the verified bytes are the bytes parsed.
    ///
    /// # Errors
    /// Returns `ModelStoreError::Manifest` only when `require_manifest` is set
    /// and the manifest is missing or unreadable. Individual artifact
    /// failures are logged and leave that tier unavailable.
    pub fn load(dir: &Path, require_manifest: bool) -> Result<Self, ModelStoreError> {
        tracing::info!("Loading models from {:?}", dir);

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            match ModelManifest::read(&manifest_path) {
                Ok(m) => Some(m),
                Err(e) if require_manifest => return Err(e),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable manifest: {e}");
                    None
                }
            }
        } else if require_manifest {
            return Err(ModelStoreError::Manifest(format!(
                "{MANIFEST_FILE} required but not found in {:?}",
                dir
            )));
        } else {
            None
        };

        let mut ensemble = EnsembleModel::new();
        match Self::verified_bytes(dir, ENSEMBLE_FILE, manifest.as_ref(), require_manifest) {
            Ok(Some((path, bytes))) => {
                if let Err(e) = ensemble.load_bytes(&bytes, &path) {
                    tracing::warn!("Ensemble model unavailable: {e}");
                }
            }
            Ok(None) => tracing::info!("No {ENSEMBLE_FILE} in {:?}", dir),
            Err(e) => tracing::warn!("Ensemble model rejected: {e}"),
        }

        let mut linear = LinearModel::new();
        match Self::verified_bytes(dir, LINEAR_FILE, manifest.as_ref(), require_manifest) {
            Ok(Some((path, bytes))) => {
                if let Err(e) = linear.load_bytes(&bytes, &path) {
                    tracing::warn!("Linear model unavailable: {e}");
                }
            }
            Ok(None) => tracing::info!("No {LINEAR_FILE} in {:?}", dir),
            Err(e) => tracing::warn!("Linear model rejected: {e}"),
        }

        let store = Self {
            ensemble: Arc::new(ensemble),
            linear: Arc::new(linear),
        };
        tracing::info!(
            "Model store ready: {} of 2 statistical tiers loaded",
            store.loaded_count()
        );
        Ok(store)
    }

    /// Load `dir`, or fall back to an empty store if loading fails.
    ///
    /// The clinical rules still answer every request from an empty store.
    #[must_use]
    pub fn load_or_empty(dir: &Path, require_manifest: bool) -> Self {
        match Self::load(dir, require_manifest) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Model store unavailable, using clinical rules only: {e}");
                Self::empty()
            }
        }
    }

    /// Contents of an artifact that exists and passed manifest verification.
    fn verified_bytes(
        dir: &Path,
        file: &str,
        manifest: Option<&ModelManifest>,
        require_binding: bool,
    ) -> Result<Option<(PathBuf, Vec<u8>)>, ModelStoreError> {
        let path = dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        if let Some(manifest) = manifest {
            manifest.verify(file, &bytes, require_binding)?;
        }
        Ok(Some((path, bytes)))
    }

    /// Number of statistical tiers with parameters resident.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        usize::from(self.ensemble.is_ready()) + usize::from(self.linear.is_ready())
    }

    /// Predictors in priority order: ensemble, then linear.
    ///
    /// Unloaded adapters are included so the controller can report them as
    /// unavailable tiers.
    #[must_use]
    pub fn predictors(&self) -> Vec<Arc<dyn Predictor>> {
        vec![
            self.ensemble.clone() as Arc<dyn Predictor>,
            self.linear.clone() as Arc<dyn Predictor>,
        ]
    }
}
