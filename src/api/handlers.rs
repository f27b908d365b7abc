//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Every handler goes through
//! the shared [`Manager`], so the HTTP surface sees exactly what library
//! callers see.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::error::{CacheError, Result};
use crate::manager::Manager;
use crate::models::{
    validate_key, CounterResponse, DeleteResponse, GetResponse, HealthResponse,
    InvalidateResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
}

impl AppState {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    state.manager.set(&req.key, &req.value, ttl).await?;

    let effective = if ttl.is_zero() {
        state.manager.default_ttl()
    } else {
        ttl
    };
    Ok(Json(SetResponse::new(req.key, effective.as_secs())))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    match state.manager.get::<serde_json::Value>(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deleting an absent key is not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;
    state.manager.delete(&[key.as_str()]).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /invalidate/:resource
///
/// Drops every cached page of `resource`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    check_key(&resource)?;
    let removed = state.manager.invalidate(&resource).await?;

    Ok(Json(InvalidateResponse { resource, removed }))
}

/// Handler for POST /incr/:key
pub async fn increment_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;
    let value = state.manager.increment(&key).await?;

    Ok(Json(CounterResponse { key, value }))
}

/// Handler for POST /decr/:key
pub async fn decrement_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;
    let value = state.manager.decrement(&key).await?;

    Ok(Json(CounterResponse { key, value }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let backend = state.manager.stats().await?;
    let metrics = state.manager.monitor().snapshot();

    Ok(Json(StatsResponse::new(backend, &metrics)))
}

/// Handler for POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> StatusCode {
    state.manager.monitor().reset();
    StatusCode::NO_CONTENT
}

/// Handler for GET /health
///
/// Pings the backend; a failed ping answers 503.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.manager.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy())),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy()),
            )
        }
    }
}
