//! Route handlers.
//!
//! Handlers translate between the wire types in `api_shared` and the core services; they hold no
//! locks and perform no persistence access of their own.

use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    AppendProcedureReq, CreatePatientReq, CreateRecordReq, ErrorRes, HealthRes, HealthService,
    ListPatientsRes, ListRecordsRes, OdontogramRes, PatientRes, RecordRes,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use odonto_types::SubjectId;
use serde_json::Value;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint; does not require a credential.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 401, description = "Missing or invalid credential", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(subject): Extension<SubjectId>,
    payload: Result<Json<CreatePatientReq>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let req = body(payload)?;
    let patient = state
        .patients
        .create_patient(&req.full_name, req.birth_date.as_deref())
        .await?;
    tracing::info!("{} registered patient {}", subject, patient.id);
    Ok((StatusCode::CREATED, Json(PatientRes::from(&patient))))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes),
        (status = 401, description = "Missing or invalid credential", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn list_patients(State(state): State<AppState>) -> Result<Json<ListPatientsRes>, ApiError> {
    let patients = state.patients.list_patients().await?;
    Ok(Json(ListPatientsRes {
        patients: patients.iter().map(PatientRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let patient = state.patients.get_patient(&patient_id).await?;
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    post,
    path = "/patients/{patient_id}/records",
    params(("patient_id" = String, Path, description = "Patient id")),
    request_body = CreateRecordReq,
    responses(
        (status = 201, description = "Clinical record created", body = RecordRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn create_record(
    State(state): State<AppState>,
    Extension(subject): Extension<SubjectId>,
    Path(patient_id): Path<String>,
    payload: Result<Json<CreateRecordReq>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordRes>), ApiError> {
    let req = body(payload)?;
    let record = state.records.create_record(&patient_id, req.summary).await?;
    tracing::info!("{} opened clinical record {}", subject, record.id);
    Ok((StatusCode::CREATED, Json(RecordRes::from(&record))))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/records",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Clinical records of the patient", body = ListRecordsRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn list_records(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<ListRecordsRes>, ApiError> {
    let records = state.records.list_records(&patient_id).await?;
    Ok(Json(ListRecordsRes {
        records: records.iter().map(RecordRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/records/{record_id}",
    params(
        ("patient_id" = String, Path, description = "Patient id"),
        ("record_id" = String, Path, description = "Clinical record id")
    ),
    responses(
        (status = 200, description = "Clinical record", body = RecordRes),
        (status = 404, description = "Unknown record for this patient", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(String, String)>,
) -> Result<Json<RecordRes>, ApiError> {
    let record = state.records.get_record(&patient_id, &record_id).await?;
    Ok(Json(RecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/records/{record_id}/odontogram",
    params(
        ("patient_id" = String, Path, description = "Patient id"),
        ("record_id" = String, Path, description = "Clinical record id")
    ),
    responses(
        (status = 200, description = "Odontogram; empty with null id before the first procedure", body = OdontogramRes),
        (status = 404, description = "Unknown record for this patient", body = ErrorRes),
        (status = 503, description = "Storage unavailable", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn get_odontogram(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(String, String)>,
) -> Result<Json<OdontogramRes>, ApiError> {
    let view = state.odontograms.get(&patient_id, &record_id).await?;
    Ok(Json(OdontogramRes::from(&view)))
}

#[utoipa::path(
    post,
    path = "/patients/{patient_id}/records/{record_id}/odontogram",
    params(
        ("patient_id" = String, Path, description = "Patient id"),
        ("record_id" = String, Path, description = "Clinical record id")
    ),
    request_body = AppendProcedureReq,
    responses(
        (status = 200, description = "Full updated odontogram", body = OdontogramRes),
        (status = 400, description = "Malformed procedure", body = ErrorRes),
        (status = 404, description = "Unknown record for this patient", body = ErrorRes),
        (status = 409, description = "Concurrent writers kept winning", body = ErrorRes),
        (status = 503, description = "Storage unavailable", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
pub async fn append_procedure(
    State(state): State<AppState>,
    Extension(subject): Extension<SubjectId>,
    Path((patient_id, record_id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OdontogramRes>, ApiError> {
    let input = body(payload)?;
    let view = state
        .odontograms
        .append_procedure(&patient_id, &record_id, &input)
        .await?;
    tracing::info!(
        "{} appended a procedure to record {} ({} total)",
        subject,
        view.record_id,
        view.procedures.len()
    );
    Ok(Json(OdontogramRes::from(&view)))
}
