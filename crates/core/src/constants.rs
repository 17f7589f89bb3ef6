//! Constants used throughout the core crate.
//!
//! Storage directory names, filenames and configuration defaults live here so the file store,
//! the services and the binaries agree on them.

use std::time::Duration;

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Directory name for patient rows.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for clinical record rows.
pub const RECORDS_DIR_NAME: &str = "records";

/// Directory name for odontogram rows, sharded by owning clinical record id.
pub const ODONTOGRAMS_DIR_NAME: &str = "odontograms";

/// Filename for a stored patient.
pub const PATIENT_JSON_FILENAME: &str = "patient.json";

/// Filename for a stored clinical record.
pub const RECORD_JSON_FILENAME: &str = "record.json";

/// Filename for a stored odontogram.
pub const ODONTOGRAM_JSON_FILENAME: &str = "odontogram.json";

/// Default bound on a single persistence call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Default number of optimistic-concurrency attempts for one append.
pub const DEFAULT_APPEND_ATTEMPTS: u32 = 5;
