//! Persistence collaborator.
//!
//! The core services talk to storage only through [`RecordStore`]: create/find by key, a
//! by-patient filter for clinical records, and a keyed full-document replace for odontograms.
//! Two backends are provided:
//!
//! - [`FileStore`]: JSON rows in sharded directories under the patient data directory.
//! - [`MemoryStore`]: process-local maps, used for development and tests.
//!
//! Odontogram rows are returned as [`StoredOdontogram`] with their `dados` document still raw.
//! Only the services in [`crate::repositories`] read those rows, and they decode `dados` through
//! [`crate::procedure`] before anything else sees it.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{CoreConfig, StoreBackend};
use crate::CoreResult;
use chrono::{DateTime, Utc};
use odonto_types::NonEmptyText;
use odonto_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A patient row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: ShardableUuid,
    pub full_name: NonEmptyText,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A clinical record (prontuário) row. Belongs to exactly one patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub id: ShardableUuid,
    pub patient_id: ShardableUuid,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An odontogram row exactly as persisted.
///
/// Unique per `record_id`. `revision` increases by one on every replace and backs the
/// compare-and-swap in [`RecordStore::replace_odontogram`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredOdontogram {
    pub id: ShardableUuid,
    pub record_id: ShardableUuid,
    pub dados: serde_json::Value,
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `Conflict` if the id is already taken.
    async fn insert_patient(&self, patient: Patient) -> CoreResult<Patient>;

    async fn find_patient(&self, id: ShardableUuid) -> CoreResult<Option<Patient>>;

    /// All patients, oldest first.
    async fn list_patients(&self) -> CoreResult<Vec<Patient>>;

    /// Fails with `Conflict` if the id is already taken.
    async fn insert_record(&self, record: ClinicalRecord) -> CoreResult<ClinicalRecord>;

    async fn find_record(&self, id: ShardableUuid) -> CoreResult<Option<ClinicalRecord>>;

    /// Records owned by `patient_id`, oldest first.
    async fn list_records_for_patient(
        &self,
        patient_id: ShardableUuid,
    ) -> CoreResult<Vec<ClinicalRecord>>;

    async fn find_odontogram_by_record(
        &self,
        record_id: ShardableUuid,
    ) -> CoreResult<Option<StoredOdontogram>>;

    /// Creates the odontogram for `row.record_id`.
    ///
    /// Fails with `Conflict` if that record already owns one.
    async fn insert_odontogram(&self, row: StoredOdontogram) -> CoreResult<StoredOdontogram>;

    /// Replaces the whole `dados` document of the odontogram owned by `record_id`.
    ///
    /// Succeeds only if the stored revision equals `expected_revision`; the returned row carries
    /// the incremented revision and a fresh `updated_at`. Fails with `Conflict` on a revision
    /// mismatch and `NotFound` if the row does not exist.
    async fn replace_odontogram(
        &self,
        record_id: ShardableUuid,
        expected_revision: u64,
        dados: serde_json::Value,
    ) -> CoreResult<StoredOdontogram>;
}

/// Opens the configured backend.
pub fn open_store(backend: StoreBackend, cfg: &CoreConfig) -> Arc<dyn RecordStore> {
    match backend {
        StoreBackend::File => Arc::new(FileStore::new(cfg)),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
