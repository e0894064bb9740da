//! Inference HTTP API
//!
//! ```text
//! POST /predict  {"features":[..10 floats..]}
//!   200 {"prediccion": "...", "confianza": 0.912}
//!   400 {"error": "..."}   malformed body or wrong feature count
//!   500 {"error": "..."}   anything else
//! GET  /         {"status":"ok","version":"...","classes":[...]}
//! ```
//!
//! The model is immutable once loaded and shared by every request through
//! an `Arc`.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fisiotech_connectors::wire::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};
use fisiotech_ml::{HybridModel, MLError};
use log::{debug, error, info};
use thiserror::Error;

use crate::VERSION;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    model: Arc<HybridModel>,
}

impl AppState {
    /// State serving `model`
    pub fn new(model: Arc<HybridModel>) -> Self {
        Self { model }
    }
}

/// API error type that converts to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unusable request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Unexpected failure (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MLError> for ApiError {
    fn from(e: MLError) -> Self {
        if e.is_validation() {
            Self::BadRequest(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Routes of the inference API
pub fn router(model: Arc<HybridModel>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .with_state(AppState::new(model))
}

/// Serve the API on `listener` until `shutdown` completes
pub async fn serve<F>(listener: tokio::net::TcpListener, model: Arc<HybridModel>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Inference API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(model))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: VERSION.into(),
        classes: state.model.classes().to_vec(),
    })
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body?;
    let classification = state.model.predict(&request.features)?;
    debug!("{} ({:.3})", classification.label, classification.confidence);
    Ok(Json(PredictResponse::new(classification.label, classification.confidence)))
}
