//! # homecore-adapter-packages-fs
//!
//! Package resolver reading script packages from a directory tree.
//!
//! ## Layout
//! ```text
//! <root>/<package id>/<version>/script.lua
//! ```
//!
//! ## Responsibilities
//! - Implement the `PackageResolver` port defined in `homecore-app::ports::package`
//! - Pick the highest available version when a reference is not pinned
//!
//! ## Dependency rule
//! Depends on `homecore-app` (for port traits) and `homecore-domain` (for domain types).

pub mod resolver;
mod version;

pub use resolver::{FsPackageResolver, SCRIPT_FILE};
