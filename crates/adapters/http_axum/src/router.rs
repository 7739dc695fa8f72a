//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use homecore_app::ports::{KeyValueStore, PackageResolver, ScriptHost};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api/v1`. Includes a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level.
pub fn build<R, H, S>(state: AppState<R, H, S>) -> Router
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
