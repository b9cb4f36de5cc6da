//! Menagerie Authz - authorization core of the Menagerie community platform
//!
//! Decides whether a principal may run an operation: community-scoped role
//! permissions, per-entity ownership, and field-level redaction, all read
//! fresh from the stores on every decision.

pub mod config;
pub mod domain;
pub mod error;
pub mod policy;
pub mod repository;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use policy::{Decision, DenyReason, Policy, PolicyEngine};
