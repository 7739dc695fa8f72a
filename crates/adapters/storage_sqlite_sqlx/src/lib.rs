//! # homecore-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `KeyValueStore` port defined in `homecore-app::ports::store`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Store structured values as JSON text keyed by their `/`-joined path
//!
//! ## Dependency rule
//! Depends on `homecore-app` (for port traits) and `homecore-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod kv_store;
pub mod pool;

pub use kv_store::SqliteKeyValueStore;
pub use pool::{Config, Database};
