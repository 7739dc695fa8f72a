//! JSON REST handlers for components.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use homecore_app::ports::{KeyValueStore, PackageResolver, ScriptHost};
use homecore_domain::component::ComponentSnapshot;
use homecore_domain::error::{ComponentNotFoundError, HubError};
use homecore_domain::id::ComponentUid;
use homecore_domain::message::Message;

use crate::error::ApiError;
use crate::state::AppState;

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only list components carrying this tag.
    pub tag: Option<String>,
}

/// Body answering a tag mutation.
#[derive(Debug, Serialize)]
pub struct TagChanged {
    pub changed: bool,
}

/// Body answering a tag lookup.
#[derive(Debug, Serialize)]
pub struct TagPresent {
    pub present: bool,
}

/// Possible responses from endpoints that only acknowledge.
pub enum AckResponse {
    NoContent,
}

impl IntoResponse for AckResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn not_found(uid: &str) -> ApiError {
    HubError::from(ComponentNotFoundError {
        uid: ComponentUid::from(uid),
    })
    .into()
}

/// `GET /api/v1/components[?tag=…]`
pub async fn list<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ComponentUid>>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let registry = state.registry();
    Json(match query.tag {
        Some(tag) => registry.find_by_tag(&tag),
        None => registry.get_uids(),
    })
}

/// `GET /api/v1/components/{uid}`
pub async fn get<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(uid): Path<String>,
) -> Result<Json<ComponentSnapshot>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    Ok(Json(state.registry().snapshot(&uid)?))
}

/// `DELETE /api/v1/components/{uid}`
pub async fn delete<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(uid): Path<String>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    if state.component_service.remove(&uid) {
        tracing::info!(uid, "component removed");
        Ok(AckResponse::NoContent)
    } else {
        Err(not_found(&uid))
    }
}

/// `POST /api/v1/components/{uid}/reload`
pub async fn reload<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(uid): Path<String>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    state.component_service.reload(&uid).await?;
    Ok(AckResponse::NoContent)
}

/// `POST /api/v1/components/{uid}/process_message`
///
/// An unknown uid answers 404 with the not-found sentinel before the body
/// is validated.
pub async fn process_message<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path(uid): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let registry = state.registry();
    if !registry.contains(&uid) {
        return Err(not_found(&uid));
    }
    let message = Message::from_value(body).map_err(HubError::from)?;
    let response = registry.process_message(&uid, message).await?;
    Ok(Json(response.into_value()))
}

/// `GET /api/v1/components/{uid}/tags/{tag}`
pub async fn has_tag<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, tag)): Path<(String, String)>,
) -> Result<Json<TagPresent>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let present = state.registry().has_tag(&uid, &tag)?;
    Ok(Json(TagPresent { present }))
}

/// `PUT /api/v1/components/{uid}/tags/{tag}`
pub async fn set_tag<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, tag)): Path<(String, String)>,
) -> Result<Json<TagChanged>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let changed = state.registry().set_tag(&uid, &tag)?;
    Ok(Json(TagChanged { changed }))
}

/// `DELETE /api/v1/components/{uid}/tags/{tag}`
pub async fn remove_tag<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, tag)): Path<(String, String)>,
) -> Result<Json<TagChanged>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let changed = state.registry().remove_tag(&uid, &tag)?;
    Ok(Json(TagChanged { changed }))
}

/// `GET /api/v1/components/{uid}/settings/{key}`
pub async fn get_setting<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let registry = state.registry();
    if !registry.has_setting(&uid, &key)? {
        return Err(ApiError::KeyNotFound(key));
    }
    Ok(Json(registry.get_setting(&uid, &key, Value::Null)?))
}

/// `PUT /api/v1/components/{uid}/settings/{key}`
///
/// The component's settings are persisted after the change.
pub async fn set_setting<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    state
        .component_service
        .set_setting(&uid, &key, value)
        .await?;
    Ok(AckResponse::NoContent)
}

/// `GET /api/v1/components/{uid}/status/{key}`
pub async fn get_status<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    let registry = state.registry();
    if !registry.has_status_value(&uid, &key)? {
        return Err(ApiError::KeyNotFound(key));
    }
    Ok(Json(registry.get_status_value(&uid, &key, Value::Null)?))
}

/// `PUT /api/v1/components/{uid}/status/{key}`
pub async fn set_status<R, H, S>(
    State(state): State<AppState<R, H, S>>,
    Path((uid, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Result<AckResponse, ApiError>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    state.registry().set_status_value(&uid, &key, value)?;
    Ok(AckResponse::NoContent)
}
