//! Patient management.
//!
//! Plain fixed-field create/read over the [`RecordStore`]; patients exist so that clinical
//! records, and through them odontograms, have an owner.

use super::shared::{bounded, resolve_id};
use crate::config::CoreConfig;
use crate::store::{Patient, RecordStore};
use crate::{CoreError, CoreResult};
use chrono::{NaiveDate, Utc};
use odonto_types::NonEmptyText;
use odonto_uuid::ShardableUuid;
use std::sync::Arc;

/// Service for patient operations.
#[derive(Clone)]
pub struct PatientService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn RecordStore>,
}

impl PatientService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self { cfg, store }
    }

    /// Registers a new patient.
    ///
    /// # Arguments
    ///
    /// * `full_name` - Patient name; must not be blank
    /// * `birth_date` - Optional date of birth in `YYYY-MM-DD` form
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if the name is blank or the birth date does not parse,
    /// or a storage error if the row cannot be written.
    pub async fn create_patient(
        &self,
        full_name: &str,
        birth_date: Option<&str>,
    ) -> CoreResult<Patient> {
        let full_name = NonEmptyText::new(full_name)
            .map_err(|_| CoreError::InvalidInput("full name is required".into()))?;
        let birth_date = birth_date
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .map_err(|_| {
                        CoreError::InvalidInput(format!("birth date '{}' is not YYYY-MM-DD", d))
                    })
            })
            .transpose()?;

        let patient = Patient {
            id: ShardableUuid::new(),
            full_name,
            birth_date,
            created_at: Utc::now(),
        };

        let patient = bounded(
            self.cfg.store_timeout(),
            "insert_patient",
            self.store.insert_patient(patient),
        )
        .await?;
        tracing::info!("created patient {}", patient.id);
        Ok(patient)
    }

    pub async fn list_patients(&self) -> CoreResult<Vec<Patient>> {
        bounded(
            self.cfg.store_timeout(),
            "list_patients",
            self.store.list_patients(),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if no patient has this id.
    pub async fn get_patient(&self, patient_id: &str) -> CoreResult<Patient> {
        let id = resolve_id("patient", patient_id)?;
        bounded(
            self.cfg.store_timeout(),
            "find_patient",
            self.store.find_patient(id),
        )
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("patient {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn test_service() -> PatientService {
        let cfg = Arc::new(CoreConfig::with_defaults(PathBuf::from("unused")));
        PatientService::new(cfg, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_patient_normalises_fields() {
        let service = test_service();

        let patient = service
            .create_patient("  Maria Oliveira ", Some(" 1990-01-15 "))
            .await
            .expect("create should succeed");

        assert_eq!(patient.full_name.as_str(), "Maria Oliveira");
        assert_eq!(patient.birth_date.as_deref(), Some("1990-01-15"));

        let fetched = service
            .get_patient(&patient.id.to_string())
            .await
            .expect("patient should be found");
        assert_eq!(fetched, patient);
    }

    #[tokio::test]
    async fn test_create_patient_rejects_invalid_input() {
        let service = test_service();

        assert!(matches!(
            service.create_patient("   ", None).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            service.create_patient("Maria", Some("15/01/1990")).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(service.list_patients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_patient_unknown_or_malformed_is_not_found() {
        let service = test_service();

        assert!(matches!(
            service.get_patient(&ShardableUuid::new().to_string()).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            service.get_patient("nope").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_patients_returns_created_patients() {
        let service = test_service();
        service.create_patient("Alice", None).await.unwrap();
        service.create_patient("Bruno", None).await.unwrap();

        let names: Vec<String> = service
            .list_patients()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.full_name.into_inner())
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Alice".to_string()));
        assert!(names.contains(&"Bruno".to_string()));
    }
}
