//! Cloud-function entry points for the idbridge reconciliation agent.
//!
//! Two triggers share one run path:
//! - HTTP: `GET`/`POST /` runs a sync and writes the rendered tally into
//!   the response body.
//! - Pub/sub push: `POST /pubsub` runs a sync and discards the tally;
//!   success is implicit from the 204, and a 500 makes the subscription
//!   redeliver.
//!
//! Configuration comes from `KSM_CONFIG_BASE64` with the optional
//! `KSM_RECORD_UID` record selector.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use idbridge_core::SyncStat;
use idbridge_directory::GoogleDirectory;
use idbridge_scim_client::{ScimClient, ScimCredentials, ScimSync};
use idbridge_secrets::config::{client_config_from_env, RECORD_UID_ENV};
use idbridge_secrets::{select_scim_record, MemorySource, RecordSource, SyncSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Per-request timeout for both the directory and SCIM transports.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let app = Router::new()
        .route("/", get(http_trigger).post(http_trigger))
        .route("/pubsub", post(pubsub_trigger))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(address = %addr, "idbridge function listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// HTTP trigger: run the sync and return the rendered tally.
async fn http_trigger() -> Response {
    match run_sync().await {
        Ok(stat) => (StatusCode::OK, stat.render()).into_response(),
        Err(err) => {
            error!(error = %err, "sync failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err}\n")).into_response()
        }
    }
}

/// Pub/sub push envelope. The message content does not parameterize the
/// run; its arrival is the trigger.
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    #[serde(default)]
    message: Option<PushMessage>,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushMessage {
    #[serde(default, rename = "messageId")]
    message_id: Option<String>,
}

/// Pub/sub trigger: run the sync and discard the tally.
async fn pubsub_trigger(Json(envelope): Json<PushEnvelope>) -> StatusCode {
    info!(
        subscription = envelope.subscription.as_deref().unwrap_or_default(),
        message_id = envelope
            .message
            .as_ref()
            .and_then(|m| m.message_id.as_deref())
            .unwrap_or_default(),
        "pub/sub trigger received"
    );
    match run_sync().await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(err) => {
            error!(error = %err, "sync failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// One reconciliation run, parameterized entirely from the environment.
async fn run_sync() -> anyhow::Result<SyncStat> {
    let payload = client_config_from_env()?;
    let source = MemorySource::from_json(&payload)?;

    let record_uid = std::env::var(RECORD_UID_ENV).ok();
    let records = source.records(record_uid.as_deref()).await?;
    let record = select_scim_record(&records, record_uid.as_deref())?;
    info!(uid = %record.uid, "selected SCIM sync record");

    let settings = SyncSettings::from_record(record)?;

    let directory = GoogleDirectory::connect(
        &settings.directory.credentials,
        &settings.directory.admin_account,
        settings.directory.scim_groups.clone(),
        REQUEST_TIMEOUT,
    )?;
    let client = ScimClient::new(
        &settings.scim.url,
        ScimCredentials::bearer(&settings.scim.token),
        REQUEST_TIMEOUT,
    )?;

    let mut sync = ScimSync::new(directory, client);
    sync.set_verbose(settings.scim.verbose);
    sync.set_destructive(settings.scim.destructive);

    Ok(sync.sync().await?)
}
