//! Repository services.
//!
//! Each service validates caller input, enforces patient/record ownership and bounds every store
//! call with the configured timeout before delegating to the [`RecordStore`](crate::store::RecordStore).

pub mod odontogram;
pub mod patients;
pub mod records;
pub(crate) mod shared;

pub use odontogram::{OdontogramService, OdontogramView};
pub use patients::PatientService;
pub use records::ClinicalRecordService;
