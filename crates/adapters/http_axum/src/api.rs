//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod components;
#[allow(clippy::missing_errors_doc)]
pub mod settings;

use axum::Router;
use axum::routing::{get, post};

use homecore_app::ports::{KeyValueStore, PackageResolver, ScriptHost};

use crate::state::AppState;

/// Build the `/api/v1` sub-router.
pub fn routes<R, H, S>() -> Router<AppState<R, H, S>>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    Router::new()
        // Components
        .route("/components", get(components::list::<R, H, S>))
        .route(
            "/components/{uid}",
            get(components::get::<R, H, S>).delete(components::delete::<R, H, S>),
        )
        .route(
            "/components/{uid}/reload",
            post(components::reload::<R, H, S>),
        )
        .route(
            "/components/{uid}/process_message",
            post(components::process_message::<R, H, S>),
        )
        .route(
            "/components/{uid}/tags/{tag}",
            get(components::has_tag::<R, H, S>)
                .put(components::set_tag::<R, H, S>)
                .delete(components::remove_tag::<R, H, S>),
        )
        .route(
            "/components/{uid}/settings/{key}",
            get(components::get_setting::<R, H, S>).put(components::set_setting::<R, H, S>),
        )
        .route(
            "/components/{uid}/status/{key}",
            get(components::get_status::<R, H, S>).put(components::set_status::<R, H, S>),
        )
        // Raw key/value store
        .route(
            "/settings/{*path}",
            get(settings::read::<R, H, S>)
                .post(settings::write::<R, H, S>)
                .delete(settings::delete::<R, H, S>),
        )
}
