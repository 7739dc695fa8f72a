//! Shared application state for axum handlers.

use std::sync::Arc;

use homecore_app::ports::{KeyValueStore, PackageResolver, ScriptHost};
use homecore_app::registry::ComponentRegistry;
use homecore_app::services::component_service::ComponentService;

/// Application state shared across all axum handlers.
///
/// Generic over the package resolver, script host and key/value store to
/// avoid dynamic dispatch. `Clone` is implemented manually so only the `Arc`
/// is cloned.
pub struct AppState<R, H, S> {
    /// Component lifecycle service; also owns the registry and the store.
    pub component_service: Arc<ComponentService<R, H, S>>,
}

impl<R, H, S> Clone for AppState<R, H, S> {
    fn clone(&self) -> Self {
        Self {
            component_service: Arc::clone(&self.component_service),
        }
    }
}

impl<R, H, S> AppState<R, H, S>
where
    R: PackageResolver + 'static,
    H: ScriptHost + 'static,
    S: KeyValueStore + 'static,
{
    pub fn new(component_service: ComponentService<R, H, S>) -> Self {
        Self::from_arc(Arc::new(component_service))
    }

    /// Use this when the service is also shared with background tasks.
    pub fn from_arc(component_service: Arc<ComponentService<R, H, S>>) -> Self {
        Self { component_service }
    }

    pub(crate) fn registry(&self) -> &Arc<ComponentRegistry> {
        self.component_service.registry()
    }

    pub(crate) fn store(&self) -> &S {
        self.component_service.store()
    }
}
