//! HTTP interface: `/health`, `/predict` and `/metrics`

use crate::config::ServerConfig;
use crate::metrics::{MetricsSnapshot, ScoringMetrics};
use crate::scorer::{Scorer, ScoringError};
use crate::types::prediction::{HealthStatus, PredictionResult};
use crate::types::transaction::TransactionRequest;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span};

/// Header carrying the request correlation id
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<Scorer>,
    pub metrics: Arc<ScoringMetrics>,
}

impl AppState {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer: Arc::new(scorer),
            metrics: Arc::new(ScoringMetrics::new()),
        }
    }
}

/// Correlation id attached to each request
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Errors returned to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.body_text())]
    Validation(#[from] JsonRejection),
    #[error("Error during prediction: {0}")]
    Scoring(#[from] ScoringError),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Malformed syntax and content type keep their own 4xx status
            ApiError::Validation(rejection) => rejection.status(),
            ApiError::Scoring(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let correlation_id = request
                .extensions()
                .get::<CorrelationId>()
                .map(|id| id.0.as_str())
                .unwrap_or("-");
            info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                correlation_id = %correlation_id,
            )
        }))
        .layer(middleware::from_fn(correlation_id))
        .with_state(state);

    if server.cors_allow_any {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Bind and serve until Ctrl-C / SIGTERM
pub async fn serve(state: AppState, server: &ServerConfig) -> Result<()> {
    let addr = server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, mode = ?state.scorer.mode(), "Fraud scoring service listening");

    axum::serve(listener, router(state, server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Reuse the caller's correlation id or mint one, and echo it back
async fn correlation_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::up())
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(tx) = payload?;
    let start = Instant::now();

    match state.scorer.score(&tx) {
        Ok(result) => {
            let mode = state.scorer.mode();
            state.metrics.record_prediction(mode, &result, start.elapsed());

            debug!(
                transaction_type = %tx.kind,
                amount = tx.amount,
                mode = ?mode,
                is_fraud = result.is_fraud,
                fraud_probability = result.fraud_probability,
                "Transaction scored"
            );

            Ok(Json(result))
        }
        Err(e) => {
            state.metrics.record_failure();
            error!(
                transaction_type = %tx.kind,
                error = %e,
                "Prediction failed"
            );
            Err(e.into())
        }
    }
}
