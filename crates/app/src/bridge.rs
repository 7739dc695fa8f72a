//! Scripting bridge: the registry as seen from inside a script.
//!
//! Script engines expose these operations as a module named
//! [`MODULE_NAME`]. Everything here is synchronous and JSON-valued because
//! scripts run on blocking worker threads; message dispatch is driven on
//! the runtime through a stored [`Handle`].
//!
//! The bridge holds the registry weakly: the registry owns the pipelines,
//! the pipelines own the script contexts, and the contexts own a bridge.
//!
//! Settings changed by a script are handed to an optional [`SettingsSink`]
//! for persistence.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use homecore_domain::error::{DispatchError, HubError};
use homecore_domain::id::ComponentUid;
use homecore_domain::message::{Message, Response};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::registry::{ComponentRegistry, call_chain};

/// Name under which script engines install the bridge.
pub const MODULE_NAME: &str = "component_registry";

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HubError>> + Send + 'a>>;

/// Receives the components whose settings a script changed.
pub trait SettingsSink: Send + Sync {
    /// Called after the settings of `uid` changed in `registry`.
    fn settings_changed<'a>(&'a self, registry: &'a ComponentRegistry, uid: &'a str)
    -> SinkFuture<'a>;
}

/// Synchronous, JSON-valued facade over the [`ComponentRegistry`].
///
/// Must only be called from blocking threads (never from an async task).
#[derive(Clone)]
pub struct RegistryBridge {
    registry: Weak<ComponentRegistry>,
    runtime: Handle,
    settings: Option<Arc<dyn SettingsSink>>,
}

impl std::fmt::Debug for RegistryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBridge")
            .field("attached", &(self.registry.strong_count() > 0))
            .field("persists_settings", &self.settings.is_some())
            .finish_non_exhaustive()
    }
}

impl RegistryBridge {
    #[must_use]
    pub fn new(registry: &Arc<ComponentRegistry>, runtime: Handle) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            runtime,
            settings: None,
        }
    }

    /// Forward every settings change made through this bridge to `sink`.
    #[must_use]
    pub fn with_settings_sink(mut self, sink: Arc<dyn SettingsSink>) -> Self {
        self.settings = Some(sink);
        self
    }

    /// # Errors
    ///
    /// Fails only when the registry is gone.
    pub fn get_uids(&self) -> Result<Vec<String>, HubError> {
        Ok(self
            .registry()?
            .get_uids()
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn set_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.registry()?.set_tag(uid, tag)
    }

    /// Alias of [`set_tag`](Self::set_tag).
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn add_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.set_tag(uid, tag)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn remove_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.registry()?.remove_tag(uid, tag)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn has_tag(&self, uid: &str, tag: &str) -> Result<bool, HubError> {
        self.registry()?.has_tag(uid, tag)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn has_status(&self, uid: &str, key: &str) -> Result<bool, HubError> {
        self.registry()?.has_status_value(uid, key)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn get_status(&self, uid: &str, key: &str, default: Value) -> Result<Value, HubError> {
        self.registry()?.get_status_value(uid, key, default)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn set_status(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        self.registry()?.set_status_value(uid, key, value)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn has_setting(&self, uid: &str, key: &str) -> Result<bool, HubError> {
        self.registry()?.has_setting(uid, key)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid.
    pub fn get_setting(&self, uid: &str, key: &str, default: Value) -> Result<Value, HubError> {
        self.registry()?.get_setting(uid, key, default)
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid, or the
    /// failure of the settings sink.
    pub fn register_setting(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        let registry = self.registry()?;
        if registry.register_setting(uid, key, value)? {
            self.settings_changed(&registry, uid)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`HubError::ComponentNotFound`] for an unknown uid, or the
    /// failure of the settings sink.
    pub fn set_setting(&self, uid: &str, key: &str, value: Value) -> Result<(), HubError> {
        let registry = self.registry()?;
        registry.set_setting(uid, key, value)?;
        self.settings_changed(&registry, uid)
    }

    /// Dispatch `message` to `uid` and wait for the result.
    ///
    /// An unknown uid yields the not-found sentinel instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if `message` is not an object, and
    /// every dispatch failure other than not-found.
    pub fn process_message(&self, uid: &str, message: Value) -> Result<Value, HubError> {
        let registry = self.registry()?;
        let not_found = || Ok(Response::component_not_found(&ComponentUid::from(uid)).into_value());

        if !registry.contains(uid) {
            return not_found();
        }
        let message = Message::from_value(message)?;
        let chain = call_chain::current();

        match self
            .runtime
            .block_on(registry.process_message_within(uid, message, chain))
        {
            Ok(response) => Ok(response.into_value()),
            Err(err) if err.is_component_not_found() => not_found(),
            Err(err) => Err(err),
        }
    }

    /// Former name of [`process_message`](Self::process_message).
    ///
    /// # Errors
    ///
    /// Same as [`process_message`](Self::process_message).
    #[deprecated(note = "use `process_message`")]
    pub fn execute_command(&self, uid: &str, message: Value) -> Result<Value, HubError> {
        tracing::warn!(uid, "`execute_command` is deprecated, use `process_message`");
        self.process_message(uid, message)
    }

    fn settings_changed(&self, registry: &ComponentRegistry, uid: &str) -> Result<(), HubError> {
        match &self.settings {
            Some(sink) => self.runtime.block_on(sink.settings_changed(registry, uid)),
            None => Ok(()),
        }
    }

    fn registry(&self) -> Result<Arc<ComponentRegistry>, HubError> {
        self.registry
            .upgrade()
            .ok_or_else(|| DispatchError::RegistryUnavailable.into())
    }
}
