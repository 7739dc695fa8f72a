//! Messages sent to a component and the responses it produces.
//!
//! Both are immutable JSON objects. A stage that transforms a message builds
//! a new one; earlier stages never observe the change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::id::ComponentUid;

/// `type` value of the sentinel returned for unknown components.
pub const COMPONENT_NOT_FOUND_TYPE: &str = "exception.component_not_found";

const TYPE_KEY: &str = "type";

/// Structured input of a component pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

/// Structured output of a component pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(Map<String, Value>);

macro_rules! impl_json_object {
    ($name:ident) => {
        impl $name {
            /// Start a new object with the given `type` discriminator.
            #[must_use]
            pub fn new(kind: impl Into<String>) -> Self {
                let mut fields = Map::new();
                fields.insert(TYPE_KEY.to_string(), Value::String(kind.into()));
                Self(fields)
            }

            /// Return a copy with `key` set to `value`.
            #[must_use]
            pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.0.insert(key.into(), value.into());
                self
            }

            /// The `type` discriminator, if present and a string.
            #[must_use]
            pub fn kind(&self) -> Option<&str> {
                self.0.get(TYPE_KEY).and_then(Value::as_str)
            }

            /// Look up a field.
            #[must_use]
            pub fn get(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }

            /// Borrow all fields.
            #[must_use]
            pub fn fields(&self) -> &Map<String, Value> {
                &self.0
            }

            /// Build from an arbitrary JSON value.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::NotAnObject`] unless `value` is an object.
            pub fn from_value(value: Value) -> Result<Self, ValidationError> {
                match value {
                    Value::Object(fields) => Ok(Self(fields)),
                    other => Err(ValidationError::NotAnObject(json_kind(&other))),
                }
            }

            /// Convert into a JSON object value.
            #[must_use]
            pub fn into_value(self) -> Value {
                Value::Object(self.0)
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(fields: Map<String, Value>) -> Self {
                Self(fields)
            }
        }

        impl TryFrom<Value> for $name {
            type Error = ValidationError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                Self::from_value(value)
            }
        }
    };
}

impl_json_object!(Message);
impl_json_object!(Response);

impl Message {
    /// Alias of [`kind`](Self::kind) matching the protocol vocabulary.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.kind()
    }
}

impl Response {
    /// The sentinel returned instead of an error when `uid` is unknown.
    #[must_use]
    pub fn component_not_found(uid: &ComponentUid) -> Self {
        Self::new(COMPONENT_NOT_FOUND_TYPE).with("component_uid", uid.as_str())
    }

    /// Whether this response is the not-found sentinel.
    #[must_use]
    pub fn is_component_not_found(&self) -> bool {
        self.kind() == Some(COMPONENT_NOT_FOUND_TYPE)
    }
}

/// Human-readable JSON type name used in validation errors.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
