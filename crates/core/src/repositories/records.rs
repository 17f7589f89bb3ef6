//! Clinical record (prontuário) management.

use super::shared::{bounded, owned_record, resolve_id};
use crate::config::CoreConfig;
use crate::store::{ClinicalRecord, RecordStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use odonto_uuid::ShardableUuid;
use std::sync::Arc;

/// Service for clinical records scoped to a patient.
#[derive(Clone)]
pub struct ClinicalRecordService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn RecordStore>,
}

impl ClinicalRecordService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self { cfg, store }
    }

    /// Opens a new clinical record for an existing patient.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the patient does not exist.
    pub async fn create_record(
        &self,
        patient_id: &str,
        summary: Option<String>,
    ) -> CoreResult<ClinicalRecord> {
        let patient_id = self.existing_patient(patient_id).await?;

        let record = ClinicalRecord {
            id: ShardableUuid::new(),
            patient_id,
            summary: summary.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            created_at: Utc::now(),
        };

        let record = bounded(
            self.cfg.store_timeout(),
            "insert_record",
            self.store.insert_record(record),
        )
        .await?;
        tracing::info!("created clinical record {} for patient {}", record.id, patient_id);
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the patient does not exist.
    pub async fn list_records(&self, patient_id: &str) -> CoreResult<Vec<ClinicalRecord>> {
        let patient_id = self.existing_patient(patient_id).await?;
        bounded(
            self.cfg.store_timeout(),
            "list_records_for_patient",
            self.store.list_records_for_patient(patient_id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the record does not exist or belongs to another patient.
    pub async fn get_record(&self, patient_id: &str, record_id: &str) -> CoreResult<ClinicalRecord> {
        let patient_id = resolve_id("patient", patient_id)?;
        let record_id = resolve_id("clinical record", record_id)?;
        owned_record(
            self.store.as_ref(),
            self.cfg.store_timeout(),
            patient_id,
            record_id,
        )
        .await
    }

    async fn existing_patient(&self, patient_id: &str) -> CoreResult<ShardableUuid> {
        let id = resolve_id("patient", patient_id)?;
        bounded(
            self.cfg.store_timeout(),
            "find_patient",
            self.store.find_patient(id),
        )
        .await?
        .map(|p| p.id)
        .ok_or_else(|| CoreError::NotFound(format!("patient {}", id)))
    }
}
