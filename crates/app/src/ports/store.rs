//! Storage port: path-addressed persistence of structured values.

use std::future::Future;

use homecore_domain::error::HubError;
use serde_json::Value;

/// Top-level directory holding per-component documents.
pub const COMPONENTS_DIR: &str = "components";

/// Name of the settings document under a component's directory.
pub const SETTINGS_DOCUMENT: &str = "settings";

/// Path of the persisted settings of component `uid`.
#[must_use]
pub fn settings_path(uid: &str) -> [&str; 3] {
    [COMPONENTS_DIR, uid, SETTINGS_DOCUMENT]
}

/// Hierarchical key/value store.
///
/// A path is a sequence of segments (`["components", "lamp", "settings"]`).
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored at `path`, if any.
    fn read(
        &self,
        path: &[&str],
    ) -> impl Future<Output = Result<Option<Value>, HubError>> + Send;

    /// Store `value` at `path`, replacing any previous value.
    fn write(
        &self,
        path: &[&str],
        value: Value,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Remove `path` and everything below it.
    fn delete(&self, path: &[&str]) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: KeyValueStore> KeyValueStore for std::sync::Arc<T> {
    fn read(
        &self,
        path: &[&str],
    ) -> impl Future<Output = Result<Option<Value>, HubError>> + Send {
        (**self).read(path)
    }

    fn write(
        &self,
        path: &[&str],
        value: Value,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).write(path, value)
    }

    fn delete(&self, path: &[&str]) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).delete(path)
    }
}
