//! Component identifier.
//!
//! Unlike generated ids, a component uid is chosen by whoever defines the
//! component (`"kitchen.ceiling_lamp"`) and is the only handle external
//! callers ever see.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Globally unique, immutable identifier of a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentUid(String);

impl ComponentUid {
    /// Borrow the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the uid can name a component.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyUid`] when the uid is empty or blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.trim().is_empty() {
            return Err(ValidationError::EmptyUid);
        }
        Ok(())
    }
}

impl From<&str> for ComponentUid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ComponentUid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<ComponentUid> for String {
    fn from(value: ComponentUid) -> Self {
        value.0
    }
}

impl Borrow<str> for ComponentUid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ComponentUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ComponentUid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uid = Self::from(s);
        uid.validate()?;
        Ok(uid)
    }
}
