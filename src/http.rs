//! HTTP surface for the service layer.
//!
//! Three entry points: the root greeting, the rolling health check, and
//! configuration record reads/upserts. Handlers hold no logic beyond
//! parameter decoding and error mapping.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::HealthConfig;
use crate::db::Database;
use crate::error::ServiceError;
use crate::history::ConfigRecord;
use crate::service::{self, ConfigManager, DEFAULT_WINDOW_MINUTES, HealthMonitor, HealthReport};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    health: Arc<HealthMonitor>,
    config: Arc<ConfigManager>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, health: HealthConfig) -> Self {
        Self {
            health: Arc::new(HealthMonitor::new(db.clone(), health)),
            config: Arc::new(ConfigManager::new(db)),
        }
    }
}

/// Build the service router with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/config", post(upsert_config))
        .route("/config/{key}", get(get_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    service::greeting()
}

#[derive(Debug, Deserialize)]
struct HealthParams {
    minutes: Option<u32>,
}

async fn health(
    State(state): State<AppState>,
    Query(params): Query<HealthParams>,
) -> Result<Json<HealthReport>, ApiError> {
    let minutes = params.minutes.unwrap_or(DEFAULT_WINDOW_MINUTES);
    Ok(Json(state.health.check(minutes).await?))
}

#[derive(Debug, Deserialize)]
struct UpsertConfigRequest {
    key: String,
    value: serde_json::Value,
    #[serde(default, alias = "metaData")]
    metadata: serde_json::Value,
}

async fn upsert_config(
    State(state): State<AppState>,
    Json(req): Json<UpsertConfigRequest>,
) -> Result<Json<ConfigRecord>, ApiError> {
    let record = state.config.upsert(&req.key, req.value, req.metadata).await?;
    Ok(Json(record))
}

async fn get_config(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ConfigRecord>, ApiError> {
    Ok(Json(state.config.get(&key).await?))
}

/// Error envelope returned to HTTP callers.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// Maps service errors onto status codes.
struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ServiceError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            ServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}
