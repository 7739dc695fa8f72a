//! Component definitions: what a component is assembled from.
//!
//! A definition names the packages providing the adapter chain and the logic
//! unit, plus the default settings the component starts with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::id::ComponentUid;

/// Reference to a script package, written `id@version` or just `id`
/// (meaning: the latest available version).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    pub id: String,
    pub version: Option<String>,
}

impl PackageRef {
    /// Reference the latest version of `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    /// Pin the reference to `version`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

impl FromStr for PackageRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, version) = match s.trim().split_once('@') {
            Some((id, version)) if !version.trim().is_empty() => {
                (id.trim(), Some(version.trim().to_string()))
            }
            Some((id, _)) => (id.trim(), None),
            None => (s.trim(), None),
        };
        if id.is_empty() {
            return Err(ValidationError::EmptyPackageId);
        }
        Ok(Self {
            id: id.to_string(),
            version,
        })
    }
}

impl TryFrom<String> for PackageRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageRef> for String {
    fn from(value: PackageRef) -> Self {
        value.to_string()
    }
}

/// Script source of one resolved package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    /// The package this unit came from, with its version resolved.
    pub package: PackageRef,
    pub source: String,
}

impl CodeUnit {
    #[must_use]
    pub fn new(package: PackageRef, source: impl Into<String>) -> Self {
        Self {
            package,
            source: source.into(),
        }
    }
}

/// Declarative description of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub uid: ComponentUid,
    /// Adapter packages, outermost first.
    #[serde(default)]
    pub adapters: Vec<PackageRef>,
    pub logic: PackageRef,
    /// Default settings, registered only when absent.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl ComponentDefinition {
    #[must_use]
    pub fn new(uid: impl Into<ComponentUid>, logic: PackageRef) -> Self {
        Self {
            uid: uid.into(),
            adapters: Vec::new(),
            logic,
            settings: Map::new(),
        }
    }

    #[must_use]
    pub fn adapter(mut self, package: PackageRef) -> Self {
        self.adapters.push(package);
        self
    }

    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUid`] when the uid is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.uid.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_parse_pinned_package_ref() {
        let package: PackageRef = "wirehome.lamp@1.2.0".parse().unwrap();
        assert_eq!(package.id, "wirehome.lamp");
        assert_eq!(package.version.as_deref(), Some("1.2.0"));
        assert_eq!(package.to_string(), "wirehome.lamp@1.2.0");
    }

    #[test]
    fn should_parse_latest_package_ref() {
        let package: PackageRef = "wirehome.lamp".parse().unwrap();
        assert_eq!(package.version, None);

        let trailing: PackageRef = "wirehome.lamp@".parse().unwrap();
        assert_eq!(trailing, package);
    }

    #[test]
    fn should_reject_empty_package_id() {
        assert_eq!(
            PackageRef::from_str("@1.0"),
            Err(ValidationError::EmptyPackageId)
        );
    }

    #[test]
    fn should_deserialize_definition_from_json() {
        let definition: ComponentDefinition = serde_json::from_value(json!({
            "uid": "kitchen.lamp",
            "adapters": ["gpio@1.0"],
            "logic": "lamp",
            "settings": {"dimmable": true}
        }))
        .unwrap();

        assert_eq!(definition.uid.as_str(), "kitchen.lamp");
        assert_eq!(definition.adapters, vec![PackageRef::new("gpio").with_version("1.0")]);
        assert_eq!(definition.logic, PackageRef::new("lamp"));
        assert_eq!(definition.settings.get("dimmable"), Some(&json!(true)));
    }

    #[test]
    fn should_default_adapters_and_settings_when_missing() {
        let definition: ComponentDefinition =
            serde_json::from_value(json!({"uid": "x", "logic": "lamp"})).unwrap();
        assert!(definition.adapters.is_empty());
        assert!(definition.settings.is_empty());
    }

    #[test]
    fn should_reject_blank_uid() {
        let definition = ComponentDefinition::new("", PackageRef::new("lamp"));
        assert_eq!(definition.validate(), Err(ValidationError::EmptyUid));
    }
}
