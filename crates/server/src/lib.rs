//! # Server - HTTP report service
//!
//! A thin axum layer over [`ReportService`]:
//!
//! ```text
//! GET  /health
//! GET  /report/{date}/{product}/{version}/{os}/{signature}
//! GET  /top-crashers/{date}/{product}/{version}/{os}
//! POST /increment-count/{date}/{product}/{version}/{os}/{signature}
//!      body: {"arch": "...", "modules": {name: version}, "addons": {name: version}}
//! ```
//!
//! `date` is `yyyyMMdd`. Path segments are percent-decoded, so signatures
//! containing `|` or `/` must be encoded by the caller.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use correlation::{CorrelationReport, ReportService, TopCrashersReport};
use counter::{CounterError, Observation, OsScope};
use rowkey::DateBucket;
use table::CellStore;
use thiserror::Error;

/// The store behind the service, shared by every request.
pub type SharedStore = Arc<dyn CellStore>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService<SharedStore>>,
}

impl AppState {
    pub fn new(service: ReportService<SharedStore>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Counter(CounterError::EmptySignature(_)) => StatusCode::BAD_REQUEST,
            ApiError::Counter(CounterError::ScopeCollision { .. }) => StatusCode::CONFLICT,
            ApiError::Counter(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Counter(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16()
        });
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| status.into_response())
    }
}

fn scope(date: &str, product: String, version: String, os: String) -> Result<OsScope, ApiError> {
    let date = DateBucket::parse(date).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(OsScope::new(date, product, version, os))
}

/// Runs store work off the async workers; WAL appends may fsync.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CounterError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

// -------------------- Handlers --------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn report(
    State(state): State<AppState>,
    Path((date, product, version, os, signature)): Path<(String, String, String, String, String)>,
) -> Result<Json<CorrelationReport>, ApiError> {
    let scope = scope(&date, product, version, os)?;
    let service = Arc::clone(&state.service);
    let report = blocking(move || service.report(&scope, &signature)).await?;
    Ok(Json(report))
}

async fn top_crashers(
    State(state): State<AppState>,
    Path((date, product, version, os)): Path<(String, String, String, String)>,
) -> Result<Json<TopCrashersReport>, ApiError> {
    let scope = scope(&date, product, version, os)?;
    let service = Arc::clone(&state.service);
    let report = blocking(move || service.top_crashers(&scope)).await?;
    Ok(Json(report))
}

async fn increment_count(
    State(state): State<AppState>,
    Path((date, product, version, os, signature)): Path<(String, String, String, String, String)>,
    Json(observation): Json<Observation>,
) -> Result<StatusCode, ApiError> {
    let scope = scope(&date, product, version, os)?;
    let service = Arc::clone(&state.service);
    blocking(move || service.record(&scope, &signature, &observation)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/report/:date/:product/:version/:os/:signature", get(report))
        .route("/top-crashers/:date/:product/:version/:os", get(top_crashers))
        .route("/increment-count/:date/:product/:version/:os/:signature", post(increment_count))
        .with_state(state)
}

pub async fn serve(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "report service listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
