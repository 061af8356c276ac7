//! Google Workspace source adapter.
//!
//! Materializes the filtered snapshot of users, groups, and transitive
//! group membership that the reconciliation engine diffs against the SCIM
//! provider. Authentication uses the service-account JWT-bearer grant with
//! an impersonated admin subject; listing goes through the Admin SDK
//! Directory REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod workspace;

pub use auth::{ServiceAccountKey, TokenCache, TokenProvider};
pub use client::DirectoryClient;
pub use error::DirectoryError;
pub use workspace::GoogleDirectory;
