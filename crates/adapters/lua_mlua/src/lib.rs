//! # homecore-adapter-lua-mlua
//!
//! Script host running adapter and logic packages in embedded Lua 5.4 through
//! [mlua](https://docs.rs/mlua).
//!
//! ## Responsibilities
//! - Implement the `ScriptHost` / `ScriptContext` ports defined in
//!   `homecore-app::ports::script`, one isolated Lua state per context
//! - Install the `component_registry` module backed by the app's
//!   `RegistryBridge`, plus `log` and the `component_uid` global
//! - Marshal values between Lua and JSON symmetrically
//! - Keep scripts away from the filesystem, processes and the debug library
//!
//! ## Dependency rule
//! Depends on `homecore-app` (for port traits) and `homecore-domain` (for domain types).

mod convert;
pub mod error;
mod host;
mod modules;

pub use error::LuaHostError;
pub use host::{LuaScriptContext, LuaScriptHost};
