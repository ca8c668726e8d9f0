//! HTTP endpoint handler functions.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::Form;
use tracing::{info, warn};

use crate::predict::{predict, PredictError, PredictionForm};
use crate::ui::{render_page, PageView};

use super::types::HealthResponse;
use super::ServerState;

/// Maximum request body size in bytes (16 KB). The form has four short fields.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Page shown for every request once loading has failed.
fn load_error_page(message: &str) -> Html<String> {
    render_page(&PageView {
        prediction_text: message,
        is_error: true,
        ..Default::default()
    })
}

pub async fn index_handler(State(state): State<Arc<ServerState>>) -> Html<String> {
    let Some(artifacts) = state.artifacts.artifacts() else {
        return load_error_page(state.artifacts.error_message().unwrap_or_default());
    };

    render_page(&PageView {
        encoders: Some(&artifacts.encoders),
        ..Default::default()
    })
}

pub async fn predict_handler(
    State(state): State<Arc<ServerState>>,
    form: Result<Form<PredictionForm>, FormRejection>,
) -> Html<String> {
    let Some(artifacts) = state.artifacts.artifacts() else {
        return load_error_page(state.artifacts.error_message().unwrap_or_default());
    };

    let start = Instant::now();
    let form = form.map(|Form(f)| f);
    let result = form
        .as_ref()
        .map_err(|rejection| PredictError::InvalidForm(rejection.body_text()))
        .and_then(|f| predict(artifacts, f));

    // Only load failures carry the error flag; a failed prediction is shown
    // as plain result text.
    let text = match result {
        Ok(prediction) => {
            info!(
                outcome = prediction.outcome.as_str(),
                pass_probability = prediction.pass_probability,
                elapsed_us = start.elapsed().as_micros() as u64,
                "prediction served"
            );
            prediction.display()
        }
        Err(e) => {
            warn!(error = %e, unseen_label = e.is_unseen_label(), "prediction failed");
            e.user_message()
        }
    };

    render_page(&PageView {
        encoders: Some(&artifacts.encoders),
        submitted: form.as_ref().ok(),
        prediction_text: &text,
        is_error: false,
    })
}

pub async fn health_handler(
    State(state): State<Arc<ServerState>>,
) -> axum::Json<HealthResponse> {
    let artifacts = state.artifacts.artifacts();
    let response = HealthResponse {
        status: if artifacts.is_some() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        artifacts_loaded: artifacts.is_some(),
        model_kind: artifacts.map(|a| a.model.kind().to_string()),
        model_hash: artifacts.map(|a| a.model_hash.clone()),
        encoder_columns: artifacts
            .map(|a| a.encoders.columns().map(str::to_string).collect())
            .unwrap_or_default(),
        error: state.artifacts.error_message().map(str::to_string),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    axum::Json(response)
}
