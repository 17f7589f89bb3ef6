//! JSON wire types.
//!
//! Field names are camelCase on the wire. Optional values are always present and serialised as
//! `null` when absent, so clients see a stable field set.

use chrono::{DateTime, SecondsFormat, Utc};
use odonto_core::{ClinicalRecord, OdontogramView, Patient, ProcedureEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine-readable kind, e.g. `not_found`.
    pub error: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientReq {
    pub full_name: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRes {
    pub id: String,
    pub full_name: String,
    pub birth_date: Option<String>,
    pub created_at: String,
}

impl From<&Patient> for PatientRes {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.to_string(),
            full_name: patient.full_name.to_string(),
            birth_date: patient.birth_date.clone(),
            created_at: timestamp(&patient.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateRecordReq {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordRes {
    pub id: String,
    pub patient_id: String,
    pub summary: Option<String>,
    pub created_at: String,
}

impl From<&ClinicalRecord> for RecordRes {
    fn from(record: &ClinicalRecord) -> Self {
        Self {
            id: record.id.to_string(),
            patient_id: record.patient_id.to_string(),
            summary: record.summary.clone(),
            created_at: timestamp(&record.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub records: Vec<RecordRes>,
}

/// Body of an append request.
///
/// Documentation only: the handler receives the raw JSON value and validates it through the
/// procedure codec, so `id` or `occurredAt` sent by a client are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppendProcedureReq {
    pub tooth: String,
    #[serde(default)]
    pub face: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureEntryRes {
    pub id: Option<String>,
    pub tooth: String,
    pub face: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub note: Option<String>,
    pub occurred_at: Option<String>,
}

impl From<&ProcedureEntry> for ProcedureEntryRes {
    fn from(entry: &ProcedureEntry) -> Self {
        Self {
            id: entry.id().map(str::to_string),
            tooth: entry.tooth().to_string(),
            face: entry.face().map(str::to_string),
            kind: entry.kind().to_string(),
            note: entry.note().map(str::to_string),
            occurred_at: entry.occurred_at().map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OdontogramDocumentRes {
    pub procedures: Vec<ProcedureEntryRes>,
}

/// Odontogram of one clinical record.
///
/// `id`, `createdAt` and `updatedAt` are `null` until the first procedure is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramRes {
    pub id: Option<String>,
    pub record_id: String,
    pub dados: OdontogramDocumentRes,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&OdontogramView> for OdontogramRes {
    fn from(view: &OdontogramView) -> Self {
        Self {
            id: view.id.map(|id| id.to_string()),
            record_id: view.record_id.to_string(),
            dados: OdontogramDocumentRes {
                procedures: view.procedures.iter().map(ProcedureEntryRes::from).collect(),
            },
            created_at: view.created_at.as_ref().map(timestamp),
            updated_at: view.updated_at.as_ref().map(timestamp),
        }
    }
}
