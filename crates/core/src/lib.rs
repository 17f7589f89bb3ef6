//! # Odonto Core
//!
//! Core business logic for the dental clinic odontogram service.
//!
//! This crate contains pure data operations and persistence:
//! - Patients and their clinical records
//! - The tolerant procedure codec for odontogram documents ([`procedure`])
//! - Find-or-create-then-append odontogram lifecycle with optimistic concurrency
//! - File-backed (sharded JSON under `PATIENT_DATA_DIR`) and in-memory stores
//!
//! **No API concerns**: Authentication, HTTP servers, or wire types belong in `api-rest` or
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod procedure;
pub mod repositories;
pub mod store;

pub use config::{CoreConfig, StoreBackend};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use procedure::ProcedureEntry;
pub use repositories::{
    ClinicalRecordService, OdontogramService, OdontogramView, PatientService,
};
pub use store::{
    open_store, ClinicalRecord, FileStore, MemoryStore, Patient, RecordStore, StoredOdontogram,
};

pub use odonto_types::{NonEmptyText, SubjectId};
pub use odonto_uuid::ShardableUuid;
