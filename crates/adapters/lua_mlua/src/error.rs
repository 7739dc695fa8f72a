//! Error types for the Lua script host.

use homecore_app::ports::ScriptError;

/// Failures while preparing a Lua state.
#[derive(Debug, thiserror::Error)]
pub enum LuaHostError {
    /// The Lua runtime rejected a setup step.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),
}

impl From<LuaHostError> for ScriptError {
    fn from(err: LuaHostError) -> Self {
        Self::Load(err.to_string())
    }
}
