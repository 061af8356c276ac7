//! CLI error types and exit codes.

use idbridge_directory::DirectoryError;
use idbridge_scim_client::ScimError;
use idbridge_secrets::SecretsError;
use thiserror::Error;

/// Exit codes:
/// - 0: success (per-entity failures are reported in the tally, not here)
/// - 1: general error
/// - 2: configuration error (missing config, no matching record)
/// - 3: fatal sync error (source, protocol, or transport breakdown)
/// - 4: cancelled
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Sync(#[from] ScimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Secrets(_) => 2,
            CliError::Directory(DirectoryError::Config(_)) => 2,
            CliError::Sync(ScimError::InvalidConfig(_)) => 2,
            CliError::Sync(ScimError::Cancelled) => 4,
            CliError::Sync(_) | CliError::Directory(_) => 3,
            CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }
    }
}
