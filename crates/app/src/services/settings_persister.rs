//! Write-through of component settings to the key/value store.
//!
//! Writes for one uid are serialized, and each one snapshots the in-memory
//! settings only once it holds that uid's turn. The last write to finish
//! therefore always carries every change that preceded it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use homecore_domain::error::HubError;
use homecore_domain::id::ComponentUid;
use serde_json::Value;

use crate::bridge::{SettingsSink, SinkFuture};
use crate::ports::KeyValueStore;
use crate::ports::store::settings_path;
use crate::registry::ComponentRegistry;

pub struct SettingsPersister<S> {
    store: S,
    turns: Mutex<HashMap<ComponentUid, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: KeyValueStore> SettingsPersister<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            turns: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write the current settings of `uid` to `components/<uid>/settings`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if `uid` is no longer
    /// registered, or a storage error.
    pub async fn persist(&self, registry: &ComponentRegistry, uid: &str) -> Result<(), HubError> {
        let turn = self.turn(uid);
        let _turn = turn.lock().await;
        let settings = registry.settings(uid)?;
        self.store
            .write(&settings_path(uid), Value::Object(settings))
            .await?;
        tracing::debug!(uid, "component settings persisted");
        Ok(())
    }

    fn turn(&self, uid: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(turns.entry(ComponentUid::from(uid)).or_default())
    }
}

impl<S: KeyValueStore> SettingsSink for SettingsPersister<S> {
    fn settings_changed<'a>(
        &'a self,
        registry: &'a ComponentRegistry,
        uid: &'a str,
    ) -> SinkFuture<'a> {
        Box::pin(self.persist(registry, uid))
    }
}
