//! idbridge — one-shot Google Workspace → SCIM 2.0 reconciliation.
//!
//! Loads the sync parameters from a secrets record, populates the
//! filtered directory snapshot, reconciles the SCIM provider against it,
//! and prints the per-entity tally. Exit code 0 means the run completed,
//! even when individual entities failed; those are reported in the tally.

use clap::Parser;
use idbridge_directory::GoogleDirectory;
use idbridge_scim_client::{ScimClient, ScimCredentials, ScimError, ScimSync};
use idbridge_secrets::config::{client_config_from_file, RECORD_UID_ENV};
use idbridge_secrets::{select_scim_record, MemorySource, RecordSource, SyncSettings};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;

use error::CliResult;

/// Per-request timeout for both the directory and SCIM transports.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reconcile a SCIM 2.0 provider against Google Workspace.
#[derive(Parser)]
#[command(name = "idbridge", version, about, long_about = None)]
struct Cli {
    /// Secrets-record UID to sync from; scans all reachable records when
    /// omitted.
    record_uid: Option<String>,

    /// Explicit path to the base64-encoded secrets-client configuration
    /// (default: ./config.base64, then ~/config.base64).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let payload = client_config_from_file(cli.config.as_deref())?;
    let source = MemorySource::from_json(&payload)?;

    let record_uid = cli
        .record_uid
        .or_else(|| std::env::var(RECORD_UID_ENV).ok());
    let records = source.records(record_uid.as_deref()).await?;
    let record = select_scim_record(&records, record_uid.as_deref())?;
    info!(uid = %record.uid, title = %record.title, "selected SCIM sync record");

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

    // Ctrl-C stops the run between requests; the partial tally is still
    // rendered below.
    let cancel = sync.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match sync.sync().await {
        Ok(stat) => {
            print!("{}", stat.render());
            Ok(())
        }
        Err(err @ ScimError::Cancelled) => {
            print!("{}", sync.stat().render());
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
