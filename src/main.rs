use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::{IdentityVerifier, auth::token_secret_from_env_value};
use odonto_core::{
    config::{core_config_from_env_values, store_backend_from_env_value},
    open_store,
};

/// Main entry point for the odontogram service
///
/// Resolves configuration once, opens the configured store and serves the REST API.
///
/// # Environment Variables
/// - `ODONTO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PATIENT_DATA_DIR`: Directory for patient data storage (default: "patient_data")
/// - `ODONTO_STORE`: `file` or `memory` (default: "file")
/// - `ODONTO_TOKEN_SECRET`: HMAC secret for identity tokens, at least 32 bytes (required)
/// - `ODONTO_STORE_TIMEOUT_MS`: Per store call timeout (default: 5000)
/// - `ODONTO_APPEND_ATTEMPTS`: Optimistic-concurrency attempts per append (default: 5)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("odonto=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ODONTO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(core_config_from_env_values(
        std::env::var("PATIENT_DATA_DIR").ok(),
        std::env::var("ODONTO_STORE_TIMEOUT_MS").ok(),
        std::env::var("ODONTO_APPEND_ATTEMPTS").ok(),
    )?);
    let backend = store_backend_from_env_value(std::env::var("ODONTO_STORE").ok())?;
    let secret = token_secret_from_env_value(std::env::var("ODONTO_TOKEN_SECRET").ok())?;
    let verifier = IdentityVerifier::new(secret)?;

    tracing::info!(
        "++ Using {:?} store (data dir {}, timeout {:?}, {} append attempts)",
        backend,
        cfg.patient_data_dir().display(),
        cfg.store_timeout(),
        cfg.append_attempts()
    );

    let store = open_store(backend, &cfg);
    let app = api_rest::router(AppState::new(cfg, store, verifier));

    tracing::info!("++ Starting odontogram REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("-- Shutting down");
}
