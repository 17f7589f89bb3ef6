//! # API Shared
//!
//! Shared utilities and definitions for the odontogram APIs.
//!
//! Contains:
//! - JSON wire types (`wire` module) used by the REST surface and the CLI
//! - Shared services like `HealthService`
//! - Identity verification and token issuing (`auth` module)
//!
//! Used by `api-rest` and `cli` for common functionality.

pub mod auth;
pub mod health;
pub mod wire;

pub use auth::{AuthError, AuthResult, IdentityVerifier, TokenIssuer};
pub use health::HealthService;
pub use wire::*;
