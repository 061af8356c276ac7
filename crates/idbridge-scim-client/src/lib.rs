//! SCIM 2.0 client and reconciliation engine.
//!
//! [`client::ScimClient`] is a thin, paginated REST wrapper over a SCIM
//! provider's `/Users` and `/Groups` endpoints. [`sync::ScimSync`] is the
//! diff-and-apply engine that brings the provider into conformance with a
//! [`idbridge_core::DirectorySource`] snapshot and reports a per-entity
//! [`idbridge_core::SyncStat`].

pub mod auth;
pub mod client;
pub mod error;
pub mod model;
pub mod sync;

pub use auth::ScimCredentials;
pub use client::ScimClient;
pub use error::{ScimError, ScimResult};
pub use sync::ScimSync;
