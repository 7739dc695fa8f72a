//! Component: the registry's unit of management.
//!
//! A component represents one device or integration instance. It carries a
//! set of tags, persisted settings, and ephemeral status values. The
//! pipeline that processes its messages lives in the application layer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::id::ComponentUid;

/// State of a single component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    uid: ComponentUid,
    tags: HashSet<String>,
    settings: Map<String, Value>,
    status: Map<String, Value>,
}

impl Component {
    /// Create a builder for constructing a [`Component`].
    #[must_use]
    pub fn builder() -> ComponentBuilder {
        ComponentBuilder::default()
    }

    /// The immutable identifier.
    #[must_use]
    pub fn uid(&self) -> &ComponentUid {
        &self.uid
    }

    #[must_use]
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> &Map<String, Value> {
        &self.status
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUid`] when the uid is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.uid.validate()
    }

    /// Add `tag`, returning whether it was absent.
    pub fn set_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Remove `tag`, returning whether it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn has_setting(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    /// Read a setting, falling back to `default` when absent.
    #[must_use]
    pub fn setting_or(&self, key: &str, default: Value) -> Value {
        self.settings.get(key).cloned().unwrap_or(default)
    }

    /// Store `value` unless `key` already holds one. Returns whether it was stored.
    pub fn register_setting(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.settings.contains_key(&key) {
            return false;
        }
        self.settings.insert(key, value);
        true
    }

    /// Store `value`, replacing any previous one.
    pub fn set_setting(&mut self, key: impl Into<String>, value: Value) {
        self.settings.insert(key.into(), value);
    }

    #[must_use]
    pub fn has_status(&self, key: &str) -> bool {
        self.status.contains_key(key)
    }

    /// Read a status value, falling back to `default` when absent.
    #[must_use]
    pub fn status_or(&self, key: &str, default: Value) -> Value {
        self.status.get(key).cloned().unwrap_or(default)
    }

    pub fn set_status(&mut self, key: impl Into<String>, value: Value) {
        self.status.insert(key.into(), value);
    }

    /// Take over tags, status and settings of the instance being replaced.
    ///
    /// Existing settings win; settings only present on `self` are kept as
    /// freshly registered defaults.
    pub fn inherit(&mut self, previous: Component) {
        self.tags.extend(previous.tags);
        self.status = previous.status;
        for (key, value) in previous.settings {
            self.settings.insert(key, value);
        }
    }

    /// Produce a serializable read-only copy.
    #[must_use]
    pub fn snapshot(&self) -> ComponentSnapshot {
        let mut tags: Vec<String> = self.tags.iter().cloned().collect();
        tags.sort();
        ComponentSnapshot {
            uid: self.uid.clone(),
            tags,
            settings: self.settings.clone(),
            status: self.status.clone(),
        }
    }
}

/// Read-only view of a component handed to transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub uid: ComponentUid,
    pub tags: Vec<String>,
    pub settings: Map<String, Value>,
    pub status: Map<String, Value>,
}

/// Step-by-step builder for [`Component`].
#[derive(Debug, Default)]
pub struct ComponentBuilder {
    uid: Option<ComponentUid>,
    tags: HashSet<String>,
    settings: Map<String, Value>,
    status: Map<String, Value>,
}

impl ComponentBuilder {
    #[must_use]
    pub fn uid(mut self, uid: impl Into<ComponentUid>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Register a setting; the first value given for a key wins.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.entry(key.into()).or_insert(value.into());
        self
    }

    #[must_use]
    pub fn status(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.status.insert(key.into(), value.into());
        self
    }

    /// Consume the builder, validate, and return a [`Component`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUid`] if the uid is missing or blank.
    pub fn build(self) -> Result<Component, ValidationError> {
        let component = Component {
            uid: self.uid.unwrap_or_else(|| ComponentUid::from("")),
            tags: self.tags,
            settings: self.settings,
            status: self.status,
        };
        component.validate()?;
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lamp() -> Component {
        Component::builder().uid("kitchen.lamp").build().unwrap()
    }

    #[test]
    fn should_reject_component_without_uid() {
        assert_eq!(Component::builder().build(), Err(ValidationError::EmptyUid));
    }

    #[test]
    fn should_report_tag_changes_idempotently() {
        let mut component = lamp();
        assert!(component.set_tag("light"));
        assert!(!component.set_tag("light"));
        assert!(component.has_tag("light"));
        assert!(component.remove_tag("light"));
        assert!(!component.remove_tag("light"));
        assert!(!component.has_tag("light"));
    }

    #[test]
    fn should_keep_first_registered_setting() {
        let mut component = lamp();
        assert!(component.register_setting("level", json!(1)));
        assert!(!component.register_setting("level", json!(2)));
        assert_eq!(component.setting_or("level", json!(null)), json!(1));

        component.set_setting("level", json!(2));
        assert_eq!(component.setting_or("level", json!(null)), json!(2));
    }

    #[test]
    fn should_fall_back_to_default_for_missing_status() {
        let component = lamp();
        assert!(!component.has_status("power"));
        assert_eq!(component.status_or("power", json!("off")), json!("off"));
    }

    #[test]
    fn should_keep_first_setting_given_to_builder() {
        let component = Component::builder()
            .uid("x")
            .setting("mode", "auto")
            .setting("mode", "manual")
            .build()
            .unwrap();
        assert_eq!(component.settings().get("mode"), Some(&json!("auto")));
    }

    #[test]
    fn should_inherit_status_tags_and_user_settings() {
        let mut previous = lamp();
        previous.set_tag("light");
        previous.set_status("power", json!("on"));
        previous.set_setting("level", json!(70));

        let mut next = Component::builder()
            .uid("kitchen.lamp")
            .setting("level", 50)
            .setting("fade_ms", 200)
            .build()
            .unwrap();
        next.inherit(previous);

        assert!(next.has_tag("light"));
        assert_eq!(next.status_or("power", json!(null)), json!("on"));
        assert_eq!(next.setting_or("level", json!(null)), json!(70));
        assert_eq!(next.setting_or("fade_ms", json!(null)), json!(200));
    }

    #[test]
    fn should_expose_builder_state_read_only() {
        let component = Component::builder()
            .uid("x")
            .tag("light")
            .status("power", "on")
            .setting("level", 3)
            .build()
            .unwrap();
        assert!(component.tags().contains("light"));
        assert_eq!(component.status().get("power"), Some(&json!("on")));
        assert_eq!(component.settings().len(), 1);
    }

    #[test]
    fn should_sort_tags_in_snapshot() {
        let component = Component::builder()
            .uid("x")
            .tag("b")
            .tag("a")
            .build()
            .unwrap();
        assert_eq!(component.snapshot().tags, vec!["a", "b"]);
    }
}
