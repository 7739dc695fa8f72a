//! Script execution port: isolated execution contexts for code units.
//!
//! The core never knows which language a package is written in. It asks a
//! [`ScriptHost`] for one context per code unit and per component, then
//! invokes named functions on it with JSON payloads.

use homecore_domain::definition::CodeUnit;
use homecore_domain::id::ComponentUid;
use serde_json::Value;

/// Failures reported by a script engine.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The code unit could not be compiled or its top-level code failed.
    #[error("failed to load script: {0}")]
    Load(String),

    /// The requested entry point does not exist in the code unit.
    #[error("function `{0}` is not defined")]
    MissingFunction(String),

    /// The script raised an error while running.
    #[error("script raised an error: {0}")]
    Runtime(String),

    /// A value could not be converted between the script and JSON.
    #[error("value conversion failed: {0}")]
    Conversion(String),
}

/// One isolated execution context bound to a single code unit.
///
/// Calls may block for as long as the script runs; callers must not invoke
/// them from an async task.
pub trait ScriptContext: Send {
    /// Whether the code unit defines `function`.
    fn has_function(&self, function: &str) -> bool;

    /// Call `function` with `payload` and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MissingFunction`] if the entry point does not
    /// exist, or the engine's failure otherwise.
    fn invoke(&mut self, function: &str, payload: Value) -> Result<Value, ScriptError>;
}

/// Factory for [`ScriptContext`]s.
pub trait ScriptHost: Send + Sync {
    type Context: ScriptContext + 'static;

    /// Load `unit` into a fresh context owned by component `uid`.
    ///
    /// Contexts are never shared: two calls always return independent state.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Load`] when the unit cannot be loaded.
    fn create_context(
        &self,
        uid: &ComponentUid,
        unit: &CodeUnit,
    ) -> Result<Self::Context, ScriptError>;
}
