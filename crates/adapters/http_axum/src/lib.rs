//! # homecore-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a JSON API over the component registry
//!   (`/api/v1/components`, `/api/v1/components/{uid}/process_message`, …)
//! - Expose the raw key/value store under `/api/v1/settings/{*path}`
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`HubError`](homecore_domain::error::HubError)s to status codes,
//!   answering unknown components with the not-found sentinel body
//!
//! ## Dependency rule
//! Depends on `homecore-app` (for port traits and services) and
//! `homecore-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
