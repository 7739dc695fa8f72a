//! JSON REST handlers for the raw key/value store.
//!
//! The wildcard path is split on `/` into store path segments, so
//! `/api/v1/settings/components/lamp/settings` addresses
//! `["components", "lamp", "settings"]`.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;

use homecore_app::ports::{KeyValueStore, PackageResolver, ScriptHost};

use crate::api::components::AckResponse;
use crate::error::ApiError;
use crate::state::AppState;

fn segments(path: &str) -> Result<Vec<&str>, ApiError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ApiError::BadRequest("settings path must not be empty".to_string()));
    }
    Ok(segments)
}

/// `GET /api/v1/settings/{*path}`
pub async fn read<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let segments = segments(&path)?;
    match state.store().read(&segments).await? {
        Some(value) => Ok(Json(value)),
        None => Err(ApiError::KeyNotFound(segments.join("/"))),
    }
}

/// `POST /api/v1/settings/{*path}`
pub async fn write<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let segments = segments(&path)?;
    state.store().write(&segments, value).await?;
    tracing::debug!(path = %segments.join("/"), "setting written");
    Ok(AckResponse::NoContent)
}

/// `DELETE /api/v1/settings/{*path}`
///
/// Removes the path and everything below it.
pub async fn delete<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(path): Path<String>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let segments = segments(&path)?;
    state.store().delete(&segments).await?;
    Ok(AckResponse::NoContent)
}
