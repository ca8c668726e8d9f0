//! Configuration and response types for the prediction server.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default model artifact, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model.json";
/// Default encoders artifact, relative to the working directory.
pub const DEFAULT_ENCODERS_PATH: &str = "encoders.json";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (defaults to 127.0.0.1:5000; use 0.0.0.0 to expose externally)
    pub bind_addr: SocketAddr,
    /// Path of the serialized model
    pub model_path: PathBuf,
    /// Path of the serialized column → encoder mapping
    pub encoders_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            encoders_path: PathBuf::from(DEFAULT_ENCODERS_PATH),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the artifacts are loaded, `degraded` otherwise.
    pub status: String,
    pub version: String,
    pub artifacts_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encoder_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub uptime_seconds: u64,
}
