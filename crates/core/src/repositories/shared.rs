//! Helpers shared by the repository services.
//!
//! - [`bounded`] puts a deadline on every store call so a stalled backend surfaces as
//!   [`CoreError::Unavailable`] instead of hanging the request.
//! - [`resolve_id`] turns a caller-supplied identifier into a key; a malformed id cannot name an
//!   existing row, so it is reported as [`CoreError::NotFound`].
//! - [`owned_record`] performs the patient/record cross-check used by every record-scoped
//!   operation.

use crate::store::{ClinicalRecord, RecordStore};
use crate::{CoreError, CoreResult};
use odonto_uuid::ShardableUuid;
use std::future::Future;
use std::time::Duration;

pub(crate) async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("store call '{}' timed out after {:?}", what, limit);
            Err(CoreError::Unavailable(format!("{} timed out", what)))
        }
    }
}

pub(crate) fn resolve_id(entity: &str, raw: &str) -> CoreResult<ShardableUuid> {
    ShardableUuid::parse(raw).map_err(|_| CoreError::NotFound(format!("{} {}", entity, raw)))
}

/// Loads a clinical record and checks that it belongs to `patient_id`.
///
/// A record owned by another patient is reported exactly like a missing one, so callers cannot
/// probe for record ids across patients.
pub(crate) async fn owned_record(
    store: &dyn RecordStore,
    limit: Duration,
    patient_id: ShardableUuid,
    record_id: ShardableUuid,
) -> CoreResult<ClinicalRecord> {
    let not_found = || {
        CoreError::NotFound(format!(
            "clinical record {} for patient {}",
            record_id, patient_id
        ))
    };

    let record = bounded(limit, "find_record", store.find_record(record_id))
        .await?
        .ok_or_else(not_found)?;
    if record.patient_id != patient_id {
        tracing::debug!(
            "record {} requested under patient {} but belongs to another patient",
            record_id,
            patient_id
        );
        return Err(not_found());
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_maps_timeout_to_unavailable() {
        let stalled = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CoreError>(())
        };

        let err = bounded(Duration::from_millis(10), "find_record", stalled)
            .await
            .expect_err("stalled call should time out");

        assert!(matches!(err, CoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_bounded_passes_through_results() {
        let value = bounded(Duration::from_secs(1), "noop", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_resolve_id_reports_malformed_ids_as_not_found() {
        assert!(matches!(
            resolve_id("patient", "../etc"),
            Err(CoreError::NotFound(_))
        ));
        assert!(resolve_id("patient", "550e8400e29b41d4a716446655440000").is_ok());
    }
}
