//! Component service: load, reload and removal of components, plus the
//! persistence of settings changed from outside a script.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use homecore_domain::definition::ComponentDefinition;
use homecore_domain::error::{ComponentNotFoundError, HubError, ValidationError};
use homecore_domain::id::ComponentUid;
use serde_json::{Map, Value};

use crate::initializer::ComponentInitializer;
use crate::ports::store::settings_path;
use crate::ports::{KeyValueStore, PackageResolver, ScriptHost};
use crate::registry::ComponentRegistry;
use crate::services::settings_persister::SettingsPersister;

/// Outcome of [`ComponentService::load_all`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<ComponentUid>,
    pub failed: Vec<(ComponentUid, HubError)>,
}

/// Application service orchestrating the component lifecycle.
pub struct ComponentService<R, H, S> {
    registry: Arc<ComponentRegistry>,
    initializer: ComponentInitializer<R, H>,
    settings: Arc<SettingsPersister<S>>,
    definitions: Mutex<HashMap<ComponentUid, ComponentDefinition>>,
}

impl<R, H, S> ComponentService<R, H, S>
where
    R: PackageResolver,
    H: ScriptHost + 'static,
    S: KeyValueStore,
{
    /// `settings` should be the persister handed to the scripting bridge, so
    /// that changes made from HTTP and from scripts share one write order.
    pub fn new(
        registry: Arc<ComponentRegistry>,
        initializer: ComponentInitializer<R, H>,
        settings: Arc<SettingsPersister<S>>,
    ) -> Self {
        Self {
            registry,
            initializer,
            settings,
            definitions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &S {
        self.settings.store()
    }

    /// Definition a component was loaded from, if it was loaded by this service.
    #[must_use]
    pub fn definition(&self, uid: &str) -> Option<ComponentDefinition> {
        self.definitions().get(uid).cloned()
    }

    /// Initialize `definition` with its persisted settings and register it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateUid`] if the uid is taken, an
    /// initialization error, or a storage error reading persisted settings.
    pub async fn load(&self, definition: ComponentDefinition) -> Result<(), HubError> {
        if self.registry.contains(definition.uid.as_str()) {
            return Err(ValidationError::DuplicateUid(definition.uid).into());
        }
        let persisted = self.persisted_settings(&definition.uid).await?;
        let wired = self.initializer.initialize(&definition, persisted).await?;
        self.registry.register(wired)?;
        self.definitions().insert(definition.uid.clone(), definition);
        Ok(())
    }

    /// Load every definition; one failing component never prevents the others.
    pub async fn load_all(
        &self,
        definitions: impl IntoIterator<Item = ComponentDefinition>,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for definition in definitions {
            let uid = definition.uid.clone();
            match self.load(definition).await {
                Ok(()) => {
                    tracing::info!(%uid, "component loaded");
                    report.loaded.push(uid);
                }
                Err(err) => {
                    tracing::error!(
                        %uid,
                        error = %err,
                        cause = ?std::error::Error::source(&err),
                        "failed to load component"
                    );
                    report.failed.push((uid, err));
                }
            }
        }
        report
    }

    /// Re-initialize `uid` from its definition and swap its pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] if `uid` was not loaded by
    /// this service, or any initialization error; on error the running
    /// pipeline is left untouched.
    pub async fn reload(&self, uid: &str) -> Result<(), HubError> {
        let definition = self.definition(uid).ok_or_else(|| ComponentNotFoundError {
            uid: ComponentUid::from(uid),
        })?;
        let persisted = self.persisted_settings(&definition.uid).await?;
        let wired = self.initializer.initialize(&definition, persisted).await?;
        self.registry.replace(wired).await?;
        tracing::info!(uid, "component reloaded");
        Ok(())
    }

    /// Unregister `uid`. Persisted settings are kept for a later load.
    pub fn remove(&self, uid: &str) -> bool {
        self.definitions().remove(uid);
        self.registry.unregister(uid)
    }

    /// Overwrite a setting and persist the component's settings.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid, or a
    /// storage error.
    pub async fn set_setting(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        self.registry.set_setting(uid, key, value)?;
        self.settings.persist(&self.registry, uid).await
    }

    async fn persisted_settings(
        &self,
        uid: &ComponentUid,
    ) -> Result<Option<Map<String, Value>>, HubError> {
        match self.store().read(&settings_path(uid.as_str())).await? {
            Some(Value::Object(settings)) => Ok(Some(settings)),
            Some(other) => {
                tracing::warn!(%uid, value = %other, "ignoring persisted settings, not an object");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn definitions(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ComponentUid, ComponentDefinition>> {
        self.definitions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
