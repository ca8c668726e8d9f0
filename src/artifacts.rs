//! Startup loading of the model and encoder artifacts.
//!
//! Loading happens exactly once, before the server starts listening. The
//! outcome is a [`LoadState`]: either both artifacts, shared read-only for the
//! rest of the process, or the message every request will show instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{error, info};

use crate::encoder::{EncoderFormatError, EncoderSet};
use crate::model::{Classifier, Model};

/// Version prefix for model hashes. Bump when the artifact format changes.
const MODEL_HASH_VERSION: &str = "v1";

/// Prefix shared by every load failure other than missing files.
pub const LOAD_ERROR_PREFIX: &str = "An error occurred while loading the model";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("file `{}` is invalid: {source}", .path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: EncoderFormatError,
    },
    #[error("{}: {reason}", .path.display())]
    Other { path: PathBuf, reason: String },
}

impl LoadError {
    fn other(path: &Path, reason: impl std::fmt::Display) -> Self {
        LoadError::Other {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Both artifacts, ready for inference.
#[derive(Debug)]
pub struct Artifacts {
    pub model: Model,
    pub encoders: EncoderSet,
    /// `sha256:` digest of the model artifact.
    pub model_hash: String,
}

impl Artifacts {
    /// `model_bytes` is the artifact the model was parsed from; it is what
    /// the hash identifies.
    pub fn new(model: Model, encoders: EncoderSet, model_bytes: &[u8]) -> Self {
        Self {
            model,
            encoders,
            model_hash: model_hash(model_bytes),
        }
    }
}

/// Compute the SHA-256 hash identifying a model artifact.
pub fn model_hash(model_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(MODEL_HASH_VERSION.as_bytes());
    hasher.update(model_bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Read both artifacts from disk.
///
/// Presence of both files is checked before either is parsed, then the model
/// is loaded before the encoders.
pub fn load(model_path: &Path, encoders_path: &Path) -> Result<Artifacts, LoadError> {
    for path in [model_path, encoders_path] {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
    }

    let model_bytes = std::fs::read(model_path).map_err(|e| LoadError::other(model_path, e))?;
    let model: Model =
        serde_json::from_slice(&model_bytes).map_err(|e| LoadError::other(model_path, e))?;
    model
        .validate()
        .map_err(|e| LoadError::other(model_path, e))?;

    let encoder_bytes =
        std::fs::read(encoders_path).map_err(|e| LoadError::other(encoders_path, e))?;
    let value: serde_json::Value =
        serde_json::from_slice(&encoder_bytes).map_err(|e| LoadError::other(encoders_path, e))?;
    let encoders =
        EncoderSet::from_json_value(value).map_err(|source| LoadError::InvalidFormat {
            path: encoders_path.to_path_buf(),
            source,
        })?;

    Ok(Artifacts::new(model, encoders, &model_bytes))
}

/// Message shown when either artifact file is missing.
pub fn not_found_message(model_path: &Path, encoders_path: &Path) -> String {
    format!(
        "ERROR: `{}` or `{}` was not found. Place both files exported by the training step \
         in the server's working directory.",
        model_path.display(),
        encoders_path.display()
    )
}

/// Process-wide result of startup loading. Never changes after construction.
#[derive(Debug, Clone)]
pub enum LoadState {
    Ready(Arc<Artifacts>),
    Failed(String),
}

impl LoadState {
    /// Load the artifacts, logging the outcome.
    pub fn load(model_path: &Path, encoders_path: &Path) -> Self {
        info!(
            model = %model_path.display(),
            encoders = %encoders_path.display(),
            "loading model and encoders"
        );
        match load(model_path, encoders_path) {
            Ok(artifacts) => {
                info!(
                    model_kind = artifacts.model.kind(),
                    classes = ?artifacts.model.classes(),
                    columns = artifacts.encoders.len(),
                    model_hash = %artifacts.model_hash,
                    "model and encoders loaded"
                );
                LoadState::Ready(Arc::new(artifacts))
            }
            Err(e) => {
                let message = match &e {
                    LoadError::NotFound(_) => not_found_message(model_path, encoders_path),
                    LoadError::InvalidFormat { .. } | LoadError::Other { .. } => {
                        format!("{LOAD_ERROR_PREFIX}: {e}")
                    }
                };
                error!(error = %e, "{}", message);
                LoadState::Failed(message)
            }
        }
    }

    pub fn artifacts(&self) -> Option<&Arc<Artifacts>> {
        match self {
            LoadState::Ready(a) => Some(a),
            LoadState::Failed(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadState::Ready(_) => None,
            LoadState::Failed(msg) => Some(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "type": "logistic_regression",
        "classes": [0, 1],
        "coef": [[0.3, 0.2, 1.1, 0.9]],
        "intercept": [-1.0]
    }"#;

    const ENCODERS: &str = r#"{
        "gender": {"classes": ["female", "male"]},
        "lunch": {"classes": ["free/reduced", "standard"]}
    }"#;

    fn write_artifacts(model: Option<&str>, encoders: Option<&str>) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let model_path = dir.path().join("model.json");
        let encoders_path = dir.path().join("encoders.json");
        if let Some(m) = model {
            std::fs::write(&model_path, m).unwrap();
        }
        if let Some(e) = encoders {
            std::fs::write(&encoders_path, e).unwrap();
        }
        (dir, model_path, encoders_path)
    }

    #[test]
    fn test_load_success() {
        let (_dir, m, e) = write_artifacts(Some(MODEL), Some(ENCODERS));
        let artifacts = load(&m, &e).unwrap();
        assert_eq!(artifacts.model.kind(), "logistic_regression");
        assert_eq!(artifacts.encoders.len(), 2);
        assert!(artifacts.model_hash.starts_with("sha256:"));
        assert_eq!(artifacts.model_hash, model_hash(MODEL.as_bytes()));
    }

    #[test]
    fn test_new_hashes_the_same_bytes_as_load() {
        let (_dir, m, e) = write_artifacts(Some(MODEL), Some(ENCODERS));
        let loaded = load(&m, &e).unwrap();
        let built = Artifacts::new(
            loaded.model.clone(),
            loaded.encoders.clone(),
            &std::fs::read(&m).unwrap(),
        );
        assert_eq!(built.model_hash, loaded.model_hash);
    }

    #[test]
    fn test_missing_files() {
        let (_dir, m, e) = write_artifacts(None, None);
        assert!(matches!(load(&m, &e), Err(LoadError::NotFound(p)) if p == m));

        let (_dir, m, e) = write_artifacts(Some(MODEL), None);
        assert!(matches!(load(&m, &e), Err(LoadError::NotFound(p)) if p == e));
    }

    #[test]
    fn test_missing_file_is_reported_even_when_the_other_is_corrupt() {
        let (_dir, m, e) = write_artifacts(Some("not json"), None);
        assert!(matches!(load(&m, &e), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_encoders_not_a_mapping() {
        let (_dir, m, e) = write_artifacts(Some(MODEL), Some(r#"["female", "male"]"#));
        assert!(matches!(load(&m, &e), Err(LoadError::InvalidFormat { .. })));
    }

    #[test]
    fn test_corrupt_artifacts_are_generic_errors() {
        let (_dir, m, e) = write_artifacts(Some("{"), Some(ENCODERS));
        assert!(matches!(load(&m, &e), Err(LoadError::Other { .. })));

        let (_dir, m, e) = write_artifacts(Some(MODEL), Some("{"));
        assert!(matches!(load(&m, &e), Err(LoadError::Other { .. })));

        let invalid_model = r#"{"type": "logistic_regression", "classes": [], "coef": [], "intercept": []}"#;
        let (_dir, m, e) = write_artifacts(Some(invalid_model), Some(ENCODERS));
        assert!(matches!(load(&m, &e), Err(LoadError::Other { .. })));

        let negative_leaf = r#"{"type": "decision_tree", "classes": [0, 1], "nodes": [{"value": [-1.0, 3.0]}]}"#;
        let (_dir, m, e) = write_artifacts(Some(negative_leaf), Some(ENCODERS));
        let err = load(&m, &e).unwrap_err();
        assert!(err.to_string().contains("negative or non-finite"));
    }

    #[test]
    fn test_load_state_messages() {
        let (_dir, m, e) = write_artifacts(None, None);
        let state = LoadState::load(&m, &e);
        assert!(state.artifacts().is_none());
        assert_eq!(state.error_message(), Some(not_found_message(&m, &e).as_str()));

        let (_dir, m, e) = write_artifacts(Some(MODEL), Some("42"));
        let state = LoadState::load(&m, &e);
        let msg = state.error_message().unwrap();
        assert!(msg.starts_with(LOAD_ERROR_PREFIX));
        assert!(msg.contains("mapping of column name to encoder"));

        let (_dir, m, e) = write_artifacts(Some(MODEL), Some(ENCODERS));
        let state = LoadState::load(&m, &e);
        assert!(state.artifacts().is_some());
        assert!(state.error_message().is_none());
    }
}
