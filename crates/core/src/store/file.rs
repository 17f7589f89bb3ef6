//! File-backed [`RecordStore`].
//!
//! ## Storage layout
//!
//! ```text
//! <patient_data_dir>/
//!   patients/<s1>/<s2>/<patient id>/patient.json
//!   records/<s1>/<s2>/<record id>/record.json
//!   odontograms/<s1>/<s2>/<record id>/odontogram.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the id. Odontograms are sharded by the
//! id of the clinical record that owns them, so a record can never own two.
//!
//! Rows are written to a sibling temp file and renamed into place, so a reader never sees a
//! half-written row. Odontogram create/replace run under a store-wide mutex, which makes the
//! revision compare-and-swap atomic within one process only. Two processes writing the same
//! data directory (for example the server and `odonto add-procedure`) are not serialised
//! against each other and can lose an append; run one writer per directory.

use super::{ClinicalRecord, Patient, RecordStore, StoredOdontogram};
use crate::config::CoreConfig;
use crate::constants::{ODONTOGRAM_JSON_FILENAME, PATIENT_JSON_FILENAME, RECORD_JSON_FILENAME};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use odonto_uuid::ShardableUuid;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

pub struct FileStore {
    patients_dir: PathBuf,
    records_dir: PathBuf,
    odontograms_dir: PathBuf,
    odontogram_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            patients_dir: cfg.patients_dir(),
            records_dir: cfg.records_dir(),
            odontograms_dir: cfg.odontograms_dir(),
            odontogram_lock: Mutex::new(()),
        }
    }

    fn odontogram_path(&self, record_id: ShardableUuid) -> PathBuf {
        record_id
            .sharded_dir(&self.odontograms_dir)
            .join(ODONTOGRAM_JSON_FILENAME)
    }
}

/// Allocates `base/<s1>/<s2>/<id>/` and writes the row into it.
///
/// The leaf directory is created with `create_dir`, so a second insert under the same id
/// fails instead of overwriting.
async fn insert_row<T: Serialize>(
    base: &Path,
    id: ShardableUuid,
    filename: &str,
    row: &T,
) -> CoreResult<()> {
    let dir = id.sharded_dir(base);
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(CoreError::StorageDirCreation)?;
    }
    match fs::create_dir(&dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(CoreError::Conflict(format!("row {} already exists", id)));
        }
        Err(e) => return Err(CoreError::StorageDirCreation(e)),
    }
    write_row(&dir.join(filename), row).await
}

async fn write_row<T: Serialize>(path: &Path, row: &T) -> CoreResult<()> {
    let json = serde_json::to_vec_pretty(row).map_err(CoreError::Serialization)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await.map_err(CoreError::FileWrite)?;
    fs::rename(&tmp, path).await.map_err(CoreError::FileWrite)
}

async fn read_row<T: DeserializeOwned>(path: &Path) -> CoreResult<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::FileRead(e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(CoreError::Deserialization)
}

/// Lists the `filename` rows of every leaf directory under `base/<s1>/<s2>/`.
///
/// A missing base directory means no rows. Rows that fail to parse are logged and skipped.
async fn scan_rows<T: DeserializeOwned>(base: &Path, filename: &str) -> CoreResult<Vec<T>> {
    let mut rows = Vec::new();
    for s1 in subdirs(base).await? {
        for s2 in subdirs(&s1).await? {
            for leaf in subdirs(&s2).await? {
                let path = leaf.join(filename);
                match read_row::<T>(&path).await {
                    Ok(Some(row)) => rows.push(row),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("skipping unreadable row {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
    Ok(rows)
}

async fn subdirs(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CoreError::FileRead(e)),
    };
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(CoreError::FileRead)? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[async_trait::async_trait]
impl RecordStore for FileStore {
    async fn insert_patient(&self, patient: Patient) -> CoreResult<Patient> {
        insert_row(
            &self.patients_dir,
            patient.id,
            PATIENT_JSON_FILENAME,
            &patient,
        )
        .await?;
        Ok(patient)
    }

    async fn find_patient(&self, id: ShardableUuid) -> CoreResult<Option<Patient>> {
        read_row(&id.sharded_dir(&self.patients_dir).join(PATIENT_JSON_FILENAME)).await
    }

    async fn list_patients(&self) -> CoreResult<Vec<Patient>> {
        let mut patients: Vec<Patient> =
            scan_rows(&self.patients_dir, PATIENT_JSON_FILENAME).await?;
        patients.sort_by_key(|p| (p.created_at, p.id));
        Ok(patients)
    }

    async fn insert_record(&self, record: ClinicalRecord) -> CoreResult<ClinicalRecord> {
        insert_row(&self.records_dir, record.id, RECORD_JSON_FILENAME, &record).await?;
        Ok(record)
    }

    async fn find_record(&self, id: ShardableUuid) -> CoreResult<Option<ClinicalRecord>> {
        read_row(&id.sharded_dir(&self.records_dir).join(RECORD_JSON_FILENAME)).await
    }

    async fn list_records_for_patient(
        &self,
        patient_id: ShardableUuid,
    ) -> CoreResult<Vec<ClinicalRecord>> {
        let mut records: Vec<ClinicalRecord> =
            scan_rows::<ClinicalRecord>(&self.records_dir, RECORD_JSON_FILENAME)
                .await?
                .into_iter()
                .filter(|r| r.patient_id == patient_id)
                .collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        Ok(records)
    }

    async fn find_odontogram_by_record(
        &self,
        record_id: ShardableUuid,
    ) -> CoreResult<Option<StoredOdontogram>> {
        read_row(&self.odontogram_path(record_id)).await
    }

    async fn insert_odontogram(&self, row: StoredOdontogram) -> CoreResult<StoredOdontogram> {
        let _guard = self.odontogram_lock.lock().await;
        let path = self.odontogram_path(row.record_id);
        if fs::try_exists(&path).await.map_err(CoreError::FileRead)? {
            return Err(CoreError::Conflict(format!(
                "record {} already has an odontogram",
                row.record_id
            )));
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(CoreError::StorageDirCreation)?;
        }
        write_row(&path, &row).await?;
        Ok(row)
    }

    async fn replace_odontogram(
        &self,
        record_id: ShardableUuid,
        expected_revision: u64,
        dados: serde_json::Value,
    ) -> CoreResult<StoredOdontogram> {
        let _guard = self.odontogram_lock.lock().await;
        let path = self.odontogram_path(record_id);
        let mut row: StoredOdontogram = read_row(&path).await?.ok_or_else(|| {
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
        write_row(&path, &row).await?;
        Ok(row)
    }
}
