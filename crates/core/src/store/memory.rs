use super::{ClinicalRecord, Patient, RecordStore, StoredOdontogram};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use odonto_uuid::ShardableUuid;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    patients: HashMap<ShardableUuid, Patient>,
    records: HashMap<ShardableUuid, ClinicalRecord>,
    // keyed by owning record id
    odontograms: HashMap<ShardableUuid, StoredOdontogram>,
}

/// In-process [`RecordStore`].
///
/// Every trait call increments [`MemoryStore::operations`], which lets callers check whether a
/// request reached persistence at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    operations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn insert_patient(&self, patient: Patient) -> CoreResult<Patient> {
        self.touch();
        let mut tables = self.tables.write().await;
        if tables.patients.contains_key(&patient.id) {
            return Err(CoreError::Conflict(format!("patient {} exists", patient.id)));
        }
        tables.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn find_patient(&self, id: ShardableUuid) -> CoreResult<Option<Patient>> {
        self.touch();
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn list_patients(&self) -> CoreResult<Vec<Patient>> {
        self.touch();
        let mut patients: Vec<Patient> =
            self.tables.read().await.patients.values().cloned().collect();
        patients.sort_by_key(|p| (p.created_at, p.id));
        Ok(patients)
    }

    async fn insert_record(&self, record: ClinicalRecord) -> CoreResult<ClinicalRecord> {
        self.touch();
        let mut tables = self.tables.write().await;
        if tables.records.contains_key(&record.id) {
            return Err(CoreError::Conflict(format!("record {} exists", record.id)));
        }
        tables.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_record(&self, id: ShardableUuid) -> CoreResult<Option<ClinicalRecord>> {
        self.touch();
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn list_records_for_patient(
        &self,
        patient_id: ShardableUuid,
    ) -> CoreResult<Vec<ClinicalRecord>> {
        self.touch();
        let mut records: Vec<ClinicalRecord> = self
            .tables
            .read()
            .await
            .records
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        Ok(records)
    }

    async fn find_odontogram_by_record(
        &self,
        record_id: ShardableUuid,
    ) -> CoreResult<Option<StoredOdontogram>> {
        self.touch();
        Ok(self.tables.read().await.odontograms.get(&record_id).cloned())
    }

    async fn insert_odontogram(&self, row: StoredOdontogram) -> CoreResult<StoredOdontogram> {
        self.touch();
        let mut tables = self.tables.write().await;
        if tables.odontograms.contains_key(&row.record_id) {
            return Err(CoreError::Conflict(format!(
                "record {} already has an odontogram",
                row.record_id
            )));
        }
        tables.odontograms.insert(row.record_id, row.clone());
        Ok(row)
    }

    async fn replace_odontogram(
        &self,
        record_id: ShardableUuid,
        expected_revision: u64,
        dados: serde_json::Value,
    ) -> CoreResult<StoredOdontogram> {
        self.touch();
        let mut tables = self.tables.write().await;
        let row = tables.odontograms.get_mut(&record_id).ok_or_else(|| {
            CoreError::NotFound(format!("odontogram for record {}", record_id))
        })?;
        if row.revision != expected_revision {
            return Err(CoreError::Conflict(format!(
                "odontogram revision is {}, expected {}",
                row.revision, expected_revision
            )));
        }
        row.dados = dados;
        row.revision += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn odontogram_for(record_id: ShardableUuid) -> StoredOdontogram {
        let now = Utc::now();
        StoredOdontogram {
            id: ShardableUuid::new(),
            record_id,
            dados: json!({"procedures": []}),
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_odontogram_is_unique_per_record() {
        let store = MemoryStore::new();
        let record_id = ShardableUuid::new();

        store
            .insert_odontogram(odontogram_for(record_id))
            .await
            .expect("first insert should succeed");
        let err = store
            .insert_odontogram(odontogram_for(record_id))
            .await
            .expect_err("second insert should conflict");

        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_checks_revision() {
        let store = MemoryStore::new();
        let record_id = ShardableUuid::new();
        store
            .insert_odontogram(odontogram_for(record_id))
            .await
            .unwrap();

        let updated = store
            .replace_odontogram(record_id, 1, json!({"procedures": [1]}))
            .await
            .expect("matching revision should replace");
        assert_eq!(updated.revision, 2);
        assert_eq!(updated.dados, json!({"procedures": [1]}));

        let err = store
            .replace_odontogram(record_id, 1, json!({"procedures": []}))
            .await
            .expect_err("stale revision should conflict");
        assert!(matches!(err, CoreError::Conflict(_)));

        let missing = store
            .replace_odontogram(ShardableUuid::new(), 0, json!({}))
            .await
            .expect_err("missing row should not be found");
        assert!(matches!(missing, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_operations_counts_every_call() {
        let store = MemoryStore::new();
        assert_eq!(store.operations(), 0);

        store.list_patients().await.unwrap();
        store.find_record(ShardableUuid::new()).await.unwrap();

        assert_eq!(store.operations(), 2);
    }
}
