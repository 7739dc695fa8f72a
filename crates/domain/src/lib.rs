//! # homecore-domain
//!
//! Pure domain model for the homecore hub runtime.
//!
//! ## Responsibilities
//! - Foundational types: component uids, error conventions
//! - Define **Components** (identity, tags, settings, status)
//! - Define **Messages** and **Responses** exchanged with a component pipeline,
//!   including the not-found sentinel
//! - Define **Component definitions** and **package references** used to
//!   assemble a component from script packages
//! - Define **stage identities** used to report pipeline failures
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod component;
pub mod definition;
pub mod message;
pub mod stage;
