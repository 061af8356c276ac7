//! Secrets-record handling for the idbridge reconciliation agent.
//!
//! A run is parameterized entirely by one vault record: the SCIM base URL
//! and bearer token, the service-account credentials and admin subject for
//! the directory, the group filter, and the verbose/destructive flags.
//! This crate models such records, selects the right one among those the
//! secrets client can reach, and extracts a [`SyncSettings`] from it.
//!
//! Retrieval from the secret store itself happens behind the
//! [`RecordSource`] trait; the bundled [`MemorySource`] consumes the record
//! payload the external secrets client hands over.

pub mod config;
pub mod record;
pub mod settings;
pub mod source;

use thiserror::Error;

pub use record::{RecordField, RecordFile, SecretRecord};
pub use settings::{select_scim_record, DirectoryParameters, ScimParameters, SyncSettings};
pub use source::{MemorySource, RecordSource};

/// Errors raised while loading sync parameters from the secret store.
///
/// Every variant is a configuration failure and fatal before any
/// directory or SCIM I/O happens.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// No reachable record looks like a SCIM sync record.
    #[error(
        "SCIM record was not found. Make sure the record is valid and shared to the secrets application"
    )]
    RecordNotFound,

    /// A required field or custom field is absent or empty.
    #[error("\"{0}\" field is missing or does not contain any value")]
    MissingField(String),

    /// A required file attachment is absent.
    #[error("record \"{uid}\" has no \"{name}\" attachment")]
    MissingFile { uid: String, name: String },

    /// The record payload or client configuration could not be decoded.
    #[error("invalid secrets payload: {0}")]
    InvalidPayload(String),

    /// The secrets-client configuration could not be located.
    #[error("secrets client configuration was not found: {0}")]
    ConfigNotFound(String),
}
