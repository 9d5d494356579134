//! # API Shared
//!
//! Shared definitions for the consultation service's outer surfaces.
//!
//! Contains:
//! - JSON request/response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `consult` CLI.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
