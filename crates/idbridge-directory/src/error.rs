//! Error types for the directory adapter.

use idbridge_core::SourceError;
use thiserror::Error;

/// Errors that can occur while talking to the directory service.
///
/// Any of these during population is fatal for the run: the snapshot is
/// unusable.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Adapter configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential material is invalid or the token grant was refused.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The directory API rejected a request.
    #[error("directory API error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// Request construction or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL composition failure.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<DirectoryError> for SourceError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Config(message) => SourceError::Config(message),
            other => SourceError::Api(other.to_string()),
        }
    }
}
