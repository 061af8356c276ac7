//! Error types for the SCIM client and reconciliation engine.

use idbridge_core::SourceError;
use thiserror::Error;

/// Result type alias using [`ScimError`].
pub type ScimResult<T> = Result<T, ScimError>;

/// Errors that can occur while talking to a SCIM provider or running a
/// reconciliation.
///
/// The engine treats `Cancelled` and anything raised while the snapshots
/// are being populated as fatal; a failed write against a single resource
/// is recorded in the tally and the run continues.
#[derive(Debug, Error)]
pub enum ScimError {
    /// Endpoint configuration is unusable (bad base URL, bad timeout).
    #[error("invalid SCIM endpoint configuration: {0}")]
    InvalidConfig(String),

    /// The directory source failed to produce a snapshot.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The provider response does not conform to the SCIM specification.
    #[error("response does not conform to SCIM specification: missing \"{0}\"")]
    Protocol(String),

    /// Pagination did not terminate within the defensive page cap.
    #[error("get SCIM resource \"{0}\" exceeded the page limit")]
    PaginationCap(String),

    /// The provider rejected a single resource operation.
    #[error("{method} SCIM \"{path}\" error: {detail}")]
    Api {
        method: String,
        path: String,
        status: u16,
        detail: String,
    },

    /// Request construction or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload could not be serialized or a response body parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL composition failure.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The run was cancelled between requests; the partial tally is
    /// available from the engine.
    #[error("sync cancelled")]
    Cancelled,
}
