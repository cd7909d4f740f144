//! HTTP surface for the screening pipeline.
//!
//! - `GET /health`: liveness plus model cache state
//! - `GET /model`: description of the model backing predictions
//! - `POST /screen`: screen an evaluation, returns a `ScreeningReport`
//! - `POST /validate`: validate a name-keyed feature map
//!
//! Model loading and inference are blocking, so handlers run them on the
//! blocking pool.

use crate::core::features::FeatureMap;
use crate::core::report::{ModelInfo, ScreeningReport};
use crate::core::validation::{validate_features, ValidationIssue};
use crate::evaluation::{ScreeningRequest, DEFAULT_REFERENCE_LANGUAGES};
use crate::model::CacheStatus;
use crate::predictor::Predictor;
use crate::transparency::SharedTransparencyLog;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Shared server state
pub struct ServerState {
    predictor: Predictor,
    log: SharedTransparencyLog,
    reference_languages: Vec<String>,
}

impl ServerState {
    pub fn new(predictor: Predictor, log: SharedTransparencyLog) -> Self {
        Self {
            predictor: predictor.with_log(log.clone()),
            log,
            reference_languages: DEFAULT_REFERENCE_LANGUAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Aliases used to binarize raw native-language records.
    pub fn with_reference_languages(mut self, languages: Vec<String>) -> Self {
        self.reference_languages = languages;
        self
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: CacheStatus,
}

/// Validation response
#[derive(Serialize)]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    #[serde(rename = "errores")]
    pub descriptions: Vec<String>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: tokio::task::JoinError) -> ApiError {
    tracing::error!("blocking task failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Internal error: {}", e),
            code: "INTERNAL_ERROR".to_string(),
        }),
    )
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.predictor.cache().status(),
    })
}

/// GET /model
async fn model(State(state): State<Arc<ServerState>>) -> Result<Json<ModelInfo>, ApiError> {
    let info = tokio::task::spawn_blocking(move || state.predictor.model_info())
        .await
        .map_err(internal_error)?;
    Ok(Json(info))
}

/// POST /screen
async fn screen(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<ScreeningReport>, ApiError> {
    let report = tokio::task::spawn_blocking(move || {
        let input = request.into_input(&state.reference_languages);
        let report = state.predictor.screen(&input);
        if let Err(e) = state.log.save() {
            tracing::warn!("Failed to save transparency stats: {}", e);
        }
        report
    })
    .await
    .map_err(internal_error)?;

    Ok(Json(report))
}

/// POST /validate
async fn validate(Json(features): Json<FeatureMap>) -> Json<ValidateResponse> {
    let report = validate_features(&features);
    Json(ValidateResponse {
        is_valid: report.is_valid,
        descriptions: report.descriptions(),
        errors: report.errors,
    })
}

/// Build the router.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/model", get(model))
        .route("/screen", post(screen))
        .route("/validate", post(validate))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    state: ServerState,
) -> std::io::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Screening server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
