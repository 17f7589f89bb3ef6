//! # API REST
//!
//! REST API implementation for the odontogram service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - The request gate that authenticates every patient/record/odontogram route
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, request tracing, status mapping)
//!
//! Uses `api-shared` for wire types and identity verification.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod gate;
mod handlers;

use api_shared::IdentityVerifier;
use axum::{middleware, routing::get, Router};
use odonto_core::{
    ClinicalRecordService, CoreConfig, OdontogramService, PatientService, RecordStore,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state for the REST API server.
///
/// Services share one configuration and one store; the verifier is shared with the gate.
#[derive(Clone)]
pub struct AppState {
    pub patients: PatientService,
    pub records: ClinicalRecordService,
    pub odontograms: OdontogramService,
    pub verifier: Arc<IdentityVerifier>,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn RecordStore>,
        verifier: IdentityVerifier,
    ) -> Self {
        Self {
            patients: PatientService::new(cfg.clone(), store.clone()),
            records: ClinicalRecordService::new(cfg.clone(), store.clone()),
            odontograms: OdontogramService::new(cfg, store),
            verifier: Arc::new(verifier),
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_patient,
        handlers::list_patients,
        handlers::get_patient,
        handlers::create_record,
        handlers::list_records,
        handlers::get_record,
        handlers::get_odontogram,
        handlers::append_procedure,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::CreatePatientReq,
        api_shared::PatientRes,
        api_shared::ListPatientsRes,
        api_shared::CreateRecordReq,
        api_shared::RecordRes,
        api_shared::ListRecordsRes,
        api_shared::AppendProcedureReq,
        api_shared::ProcedureEntryRes,
        api_shared::OdontogramDocumentRes,
        api_shared::OdontogramRes,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Builds the full router: gated API routes, unauthenticated health and documentation.
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/:patient_id", get(handlers::get_patient))
        .route(
            "/patients/:patient_id/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/patients/:patient_id/records/:record_id",
            get(handlers::get_record),
        )
        .route(
            "/patients/:patient_id/records/:record_id/odontogram",
            get(handlers::get_odontogram).post(handlers::append_procedure),
        )
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            gate::require_identity,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(gated)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::TokenIssuer;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use odonto_core::MemoryStore;
    use odonto_types::SubjectId;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-that-is-long-enough-000000";

    struct TestApp {
        app: Router,
        store: Arc<MemoryStore>,
        token: String,
    }

    fn test_app() -> TestApp {
        let cfg = Arc::new(CoreConfig::with_defaults(PathBuf::from("unused")));
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            cfg,
            store.clone(),
            IdentityVerifier::new(SECRET).unwrap(),
        );
        let token = TokenIssuer::new(SECRET)
            .unwrap()
            .issue(
                &SubjectId::new("dr.costa").unwrap(),
                chrono::Duration::minutes(10),
            )
            .unwrap();
        TestApp {
            app: router(state),
            store,
            token,
        }
    }

    impl TestApp {
        async fn send(
            &self,
            method: Method,
            uri: &str,
            auth: Option<&str>,
            body: Option<&str>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(auth) = auth {
                builder = builder.header(header::AUTHORIZATION, auth);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }

        async fn authed(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let auth = format!("Bearer {}", self.token);
            let body = body.map(|b| b.to_string());
            self.send(method, uri, Some(&auth), body.as_deref()).await
        }

        async fn patient_and_record(&self) -> (String, String) {
            let (status, patient) = self
                .authed(Method::POST, "/patients", Some(json!({"fullName": "Maria Souza"})))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            let patient_id = patient["id"].as_str().unwrap().to_string();

            let (status, record) = self
                .authed(
                    Method::POST,
                    &format!("/patients/{}/records", patient_id),
                    Some(json!({})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            (patient_id, record["id"].as_str().unwrap().to_string())
        }
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let t = test_app();

        let (status, body) = t.send(Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_gate_rejects_before_any_store_access() {
        let t = test_app();
        let odontogram = format!(
            "/patients/{}/records/{}/odontogram",
            odonto_core::ShardableUuid::new(),
            odonto_core::ShardableUuid::new()
        );
        let other_secret_token = TokenIssuer::new("another-secret-that-is-long-enough-111")
            .unwrap()
            .issue(&SubjectId::new("eve").unwrap(), chrono::Duration::minutes(10))
            .unwrap();
        let forged = format!("Bearer {}", other_secret_token);

        let cases: Vec<(Method, &str, Option<&str>, Option<&str>)> = vec![
            (Method::GET, "/patients", None, None),
            (Method::POST, "/patients", None, Some(r#"{"fullName":"X"}"#)),
            (Method::GET, odontogram.as_str(), Some("Bearer"), None),
            (Method::GET, odontogram.as_str(), Some("Bearer garbage"), None),
            (Method::GET, odontogram.as_str(), Some(forged.as_str()), None),
            (
                Method::POST,
                odontogram.as_str(),
                None,
                Some(r#"{"tooth":"11","type":"canal"}"#),
            ),
            (
                Method::POST,
                odontogram.as_str(),
                Some("Bearer garbage"),
                Some("not json"),
            ),
        ];

        for (method, uri, auth, body) in cases {
            let (status, error) = t.send(method.clone(), uri, auth, body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(error["error"], json!("unauthenticated"));
        }

        assert_eq!(t.store.operations(), 0, "gate must stop calls before persistence");
    }

    #[tokio::test]
    async fn test_odontogram_read_before_first_write_is_empty() {
        let t = test_app();
        let (patient_id, record_id) = t.patient_and_record().await;

        let (status, body) = t
            .authed(
                Method::GET,
                &format!("/patients/{}/records/{}/odontogram", patient_id, record_id),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "id": null,
                "recordId": record_id,
                "dados": {"procedures": []},
                "createdAt": null,
                "updatedAt": null,
            })
        );
    }

    #[tokio::test]
    async fn test_append_procedures_preserves_history() {
        let t = test_app();
        let (patient_id, record_id) = t.patient_and_record().await;
        let uri = format!("/patients/{}/records/{}/odontogram", patient_id, record_id);

        let (status, first) = t
            .authed(
                Method::POST,
                &uri,
                Some(json!({"tooth": "11", "face": "M", "type": "restauração", "id": "mine"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let first_entry = first["dados"]["procedures"][0].clone();
        assert_ne!(first_entry["id"], json!("mine"), "client id must be ignored");
        assert!(first_entry["occurredAt"].is_string());
        assert_eq!(first_entry["note"], Value::Null);

        let (status, second) = t
            .authed(
                Method::POST,
                &uri,
                Some(json!({"tooth": "46", "type": "canal", "note": "sessão 1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["id"], first["id"]);

        let (_, read) = t.authed(Method::GET, &uri, None).await;
        let procedures = read["dados"]["procedures"].as_array().unwrap();
        assert_eq!(procedures.len(), 2);
        assert_eq!(procedures[0], first_entry);
        assert_eq!(procedures[1]["tooth"], json!("46"));
        assert_eq!(procedures[1]["note"], json!("sessão 1"));
        assert!(read["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_append_rejects_invalid_bodies() {
        let t = test_app();
        let (patient_id, record_id) = t.patient_and_record().await;
        let uri = format!("/patients/{}/records/{}/odontogram", patient_id, record_id);
        let auth = format!("Bearer {}", t.token);

        for body in [
            r#"{"type": "canal"}"#,
            r#"{"tooth": "  ", "type": "canal"}"#,
            r#"{"tooth": "11", "type": "canal", "note": 3}"#,
            r#"[{"tooth": "11", "type": "canal"}]"#,
            "not json",
        ] {
            let (status, error) = t.send(Method::POST, &uri, Some(&auth), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(error["error"], json!("invalid_input"));
        }

        let (_, read) = t.authed(Method::GET, &uri, None).await;
        assert_eq!(read["id"], Value::Null, "nothing should have been written");
    }

    #[tokio::test]
    async fn test_records_of_other_patients_are_not_found() {
        let t = test_app();
        let (_, record_id) = t.patient_and_record().await;
        let (_, other) = t
            .authed(Method::POST, "/patients", Some(json!({"fullName": "João"})))
            .await;
        let other_id = other["id"].as_str().unwrap();

        for uri in [
            format!("/patients/{}/records/{}", other_id, record_id),
            format!("/patients/{}/records/{}/odontogram", other_id, record_id),
            format!("/patients/{}/records/not-an-id/odontogram", other_id),
        ] {
            let (status, error) = t.authed(Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(error["error"], json!("not_found"));
        }

        let (status, _) = t
            .authed(
                Method::POST,
                &format!("/patients/{}/records/{}/odontogram", other_id, record_id),
                Some(json!({"tooth": "11", "type": "canal"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patient_endpoints() {
        let t = test_app();

        let (status, error) = t
            .authed(Method::POST, "/patients", Some(json!({"fullName": "  "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], json!("invalid_input"));

        let (status, created) = t
            .authed(
                Method::POST,
                "/patients",
                Some(json!({"fullName": "Ana Paula", "birthDate": "1985-07-30"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["birthDate"], json!("1985-07-30"));

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = t
            .authed(Method::GET, &format!("/patients/{}", id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (_, listed) = t.authed(Method::GET, "/patients", None).await;
        assert_eq!(listed["patients"].as_array().unwrap().len(), 1);

        let (status, records) = t
            .authed(Method::GET, &format!("/patients/{}/records", id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(records, json!({"records": []}));
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let t = test_app();

        let (status, doc) = t
            .send(Method::GET, "/api-docs/openapi.json", None, None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]
            .get("/patients/{patient_id}/records/{record_id}/odontogram")
            .is_some());
        assert!(doc["components"]["securitySchemes"].get("bearer").is_some());
    }
}
