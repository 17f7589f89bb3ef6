//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the core services.
//! Nothing in this crate reads process-wide environment variables while handling a request; the
//! `*_from_env_value` helpers only parse values the binary has already read.

use crate::constants::{
    DEFAULT_APPEND_ATTEMPTS, DEFAULT_PATIENT_DATA_DIR, DEFAULT_STORE_TIMEOUT, ODONTOGRAMS_DIR_NAME, PATIENTS_DIR_NAME,
    RECORDS_DIR_NAME,
};
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which [`RecordStore`](crate::store::RecordStore) backend the process runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// JSON rows in sharded directories under the patient data directory.
    File,
    /// Process-local maps; contents are lost on exit.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(CoreError::InvalidInput(format!(
                "unknown store backend '{}' (expected 'file' or 'memory')",
                other
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    store_timeout: Duration,
    append_attempts: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if `store_timeout` is zero or `append_attempts` is
    /// zero.
    pub fn new(
        patient_data_dir: PathBuf,
        store_timeout: Duration,
        append_attempts: u32,
    ) -> CoreResult<Self> {
        if store_timeout.is_zero() {
            return Err(CoreError::InvalidInput(
                "store timeout must be greater than zero".into(),
            ));
        }
        if append_attempts == 0 {
            return Err(CoreError::InvalidInput(
                "append attempts must be at least 1".into(),
            ));
        }

        Ok(Self {
            patient_data_dir,
            store_timeout,
            append_attempts,
        })
    }

    /// Configuration with default timeout and attempt count.
    pub fn with_defaults(patient_data_dir: PathBuf) -> Self {
        Self {
            patient_data_dir,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            append_attempts: DEFAULT_APPEND_ATTEMPTS,
        }
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.patient_data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn odontograms_dir(&self) -> PathBuf {
        self.patient_data_dir.join(ODONTOGRAMS_DIR_NAME)
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn append_attempts(&self) -> u32 {
        self.append_attempts
    }
}

/// Parse the store timeout (milliseconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn store_timeout_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    match non_blank(value) {
        None => Ok(DEFAULT_STORE_TIMEOUT),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| CoreError::InvalidInput(format!("invalid store timeout '{}'", v))),
    }
}

/// Parse the append attempt count from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default attempt count.
pub fn append_attempts_from_env_value(value: Option<String>) -> CoreResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_APPEND_ATTEMPTS),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidInput(format!("invalid append attempts '{}'", v))),
    }
}

/// Parse the store backend from an optional string value, defaulting to [`StoreBackend::File`].
pub fn store_backend_from_env_value(value: Option<String>) -> CoreResult<StoreBackend> {
    non_blank(value)
        .map(|v| v.parse())
        .transpose()
        .map(|backend| backend.unwrap_or(StoreBackend::File))
}

/// Builds a [`CoreConfig`] from raw environment values, applying defaults for absent ones.
///
/// # Arguments
///
/// * `patient_data_dir` - `PATIENT_DATA_DIR`
/// * `store_timeout_ms` - `ODONTO_STORE_TIMEOUT_MS`
/// * `append_attempts` - `ODONTO_APPEND_ATTEMPTS`
pub fn core_config_from_env_values(
    patient_data_dir: Option<String>,
    store_timeout_ms: Option<String>,
    append_attempts: Option<String>,
) -> CoreResult<CoreConfig> {
    let dir = non_blank(patient_data_dir).unwrap_or_else(|| DEFAULT_PATIENT_DATA_DIR.into());
    CoreConfig::new(
        PathBuf::from(dir),
        store_timeout_from_env_value(store_timeout_ms)?,
        append_attempts_from_env_value(append_attempts)?,
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
