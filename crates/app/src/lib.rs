//! # homecore-app
//!
//! Application layer: the component runtime and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement (driven/outbound ports):
//!   - `ScriptHost` / `ScriptContext`: isolated script execution contexts
//!   - `PackageResolver`: package reference to code unit
//!   - `KeyValueStore`: path-keyed persistence of structured values
//! - Own the **component registry**: per-component state and execution gates,
//!   message dispatch on blocking workers, cooperative cancellation
//! - Define the **pipeline**: adapter chain + logic unit, native or scripted
//! - Assemble components from package references (**initializer**)
//! - Expose the registry to embedded scripts (**bridge**)
//! - Orchestrate load / reload / removal and settings persistence (**services**)
//!
//! ## Dependency rule
//! Depends on `homecore-domain` only (plus `tokio` for sync primitives and
//! blocking workers). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod bridge;
pub mod initializer;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod services;
pub mod shutdown;
