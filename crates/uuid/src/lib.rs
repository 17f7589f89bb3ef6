//! Identifier and sharded-path utilities.
//!
//! Every persisted entity (patients, clinical records, odontograms and the procedure entries
//! inside an odontogram) is identified by a *canonical* UUID: **32 lowercase hexadecimal
//! characters**, no hyphens. This is the same value produced by
//! `Uuid::new_v4().simple().to_string()`.
//!
//! Identifiers arriving from outside (URL path segments, CLI arguments) must already be
//! canonical; [`ShardableUuid::parse`] rejects every other spelling instead of normalising it,
//! so a single entity never has two keys.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, the file store keeps an entity under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `patient_data/records/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps directory fan-out bounded as the number of records grows.

mod service;

pub use service::{ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
