//! Odontogram lifecycle.
//!
//! Each clinical record owns at most one odontogram, created lazily by the first appended
//! procedure:
//!
//! ```text
//! Absent --append--> Present{[e1]} --append--> Present{[e1, e2]} --> ...
//! ```
//!
//! There is no transition back to `Absent` and no operation that edits or removes an entry; the
//! procedure list is an append-only clinical history whose order is insertion order.
//!
//! ## Concurrency
//!
//! An append reads the current row, appends in memory and writes the whole document back with
//! [`RecordStore::replace_odontogram`], which only succeeds if the row's revision is unchanged.
//! On a revision conflict (or a lost race to create the row) the append re-reads and tries
//! again, up to [`CoreConfig::append_attempts`] times, so concurrent appends to one record are
//! all kept. The new entry's id and timestamp are fixed before the first attempt.
//!
//! A write that times out is not cancelled inside the store and may still be applied. Before
//! reporting `Unavailable` the append re-reads the row and succeeds if its entry id is already
//! there, so a caller never sees a failure for an entry that was stored.

use super::shared::{bounded, owned_record, resolve_id};
use crate::config::CoreConfig;
use crate::procedure::{self, ProcedureEntry};
use crate::store::{ClinicalRecord, RecordStore, StoredOdontogram};
use crate::{CoreError, CoreResult, ErrorKind};
use chrono::{DateTime, Utc};
use odonto_uuid::ShardableUuid;
use serde_json::Value;
use std::sync::Arc;

/// Decoded odontogram as returned to callers.
///
/// When the record has no odontogram yet, `id`, `created_at` and `updated_at` are `None` and
/// `procedures` is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OdontogramView {
    pub id: Option<ShardableUuid>,
    pub record_id: ShardableUuid,
    pub procedures: Vec<ProcedureEntry>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OdontogramView {
    fn empty(record_id: ShardableUuid) -> Self {
        Self {
            id: None,
            record_id,
            procedures: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Canonical `dados` document for this view.
    pub fn document(&self) -> Value {
        procedure::encode(&self.procedures)
    }
}

/// Find-or-create-then-append service for odontograms.
#[derive(Clone)]
pub struct OdontogramService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn RecordStore>,
}

impl OdontogramService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn RecordStore>) -> Self {
        Self { cfg, store }
    }

    /// Reads the odontogram of a patient's clinical record.
    ///
    /// A record without an odontogram yields an empty view rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the record does not exist or does not belong to the
    /// patient, and `CoreError::Unavailable` if the store does not answer in time.
    pub async fn get(&self, patient_id: &str, record_id: &str) -> CoreResult<OdontogramView> {
        let record = self.record(patient_id, record_id).await?;

        let stored = bounded(
            self.cfg.store_timeout(),
            "find_odontogram_by_record",
            self.store.find_odontogram_by_record(record.id),
        )
        .await?;

        Ok(match stored {
            Some(row) => self.view(row),
            None => OdontogramView::empty(record.id),
        })
    }

    /// Appends one procedure to a patient's clinical record, creating the odontogram on first use.
    ///
    /// `input` is the raw request body. Only `tooth`, `face`, `type` and `note` are taken from
    /// it; the entry id and timestamp are always assigned here.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `input` is not a well-shaped procedure,
    /// `CoreError::NotFound` if the patient/record pair does not resolve, `CoreError::Conflict`
    /// if every attempt lost a race with a concurrent writer, and `CoreError::Unavailable` if
    /// the store does not answer in time.
    pub async fn append_procedure(
        &self,
        patient_id: &str,
        record_id: &str,
        input: &Value,
    ) -> CoreResult<OdontogramView> {
        let draft = procedure::decode_one(input).ok_or_else(|| {
            CoreError::InvalidInput(
                "procedure requires non-empty string 'tooth' and 'type'; 'face' and 'note' must be strings"
                    .into(),
            )
        })?;
        let record = self.record(patient_id, record_id).await?;
        let entry = draft.stamped(ShardableUuid::new(), Utc::now());

        for attempt in 1..=self.cfg.append_attempts() {
            let current = bounded(
                self.cfg.store_timeout(),
                "find_odontogram_by_record",
                self.store.find_odontogram_by_record(record.id),
            )
            .await?;

            let written = match current {
                None => self.create_with(&record, &entry).await,
                Some(row) => self.append_to(row, &entry).await,
            };

            match written {
                Ok(row) => {
                    tracing::info!(
                        "appended procedure {} to odontogram of record {}",
                        entry.id().unwrap_or_default(),
                        record.id
                    );
                    return Ok(self.view(row));
                }
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    tracing::debug!(
                        "concurrent odontogram write on record {} (attempt {}): {}",
                        record.id,
                        attempt,
                        e
                    );
                }
                Err(e) if e.kind() == ErrorKind::Unavailable => {
                    return self.settle_timed_out_write(&record, &entry, e).await;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            "gave up appending to odontogram of record {} after {} attempts",
            record.id,
            self.cfg.append_attempts()
        );
        Err(CoreError::Conflict(format!(
            "odontogram of record {} is being modified concurrently",
            record.id
        )))
    }

    /// Resolves a write whose acknowledgement timed out: success if `entry` landed anyway,
    /// otherwise the original error.
    async fn settle_timed_out_write(
        &self,
        record: &ClinicalRecord,
        entry: &ProcedureEntry,
        timed_out: CoreError,
    ) -> CoreResult<OdontogramView> {
        let current = bounded(
            self.cfg.store_timeout(),
            "find_odontogram_by_record",
            self.store.find_odontogram_by_record(record.id),
        )
        .await?;

        match current {
            Some(row) if self.decode(&row).iter().any(|e| e.id() == entry.id()) => {
                tracing::warn!(
                    "write of procedure {} to record {} timed out but was applied",
                    entry.id().unwrap_or_default(),
                    record.id
                );
                Ok(self.view(row))
            }
            _ => Err(timed_out),
        }
    }

    async fn record(&self, patient_id: &str, record_id: &str) -> CoreResult<ClinicalRecord> {
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

    /// Creates the odontogram already holding its first entry.
    async fn create_with(
        &self,
        record: &ClinicalRecord,
        entry: &ProcedureEntry,
    ) -> CoreResult<StoredOdontogram> {
        let now = Utc::now();
        let row = StoredOdontogram {
            id: ShardableUuid::new(),
            record_id: record.id,
            dados: procedure::encode(std::slice::from_ref(entry)),
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        bounded(
            self.cfg.store_timeout(),
            "insert_odontogram",
            self.store.insert_odontogram(row),
        )
        .await
    }

    async fn append_to(
        &self,
        row: StoredOdontogram,
        entry: &ProcedureEntry,
    ) -> CoreResult<StoredOdontogram> {
        let mut entries = self.decode(&row);
        entries.push(entry.clone());
        bounded(
            self.cfg.store_timeout(),
            "replace_odontogram",
            self.store
                .replace_odontogram(row.record_id, row.revision, procedure::encode(&entries)),
        )
        .await
    }

    fn decode(&self, row: &StoredOdontogram) -> Vec<ProcedureEntry> {
        let decoded = procedure::decode_counted(&row.dados);
        if decoded.dropped > 0 {
            tracing::warn!(
                "dropped {} malformed procedure entries from odontogram {} (record {})",
                decoded.dropped,
                row.id,
                row.record_id
            );
        }
        decoded.entries
    }

    fn view(&self, row: StoredOdontogram) -> OdontogramView {
        OdontogramView {
            procedures: self.decode(&row),
            id: Some(row.id),
            record_id: row.record_id,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}
