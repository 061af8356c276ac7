//! The capability a directory source offers to the reconciliation engine.

use crate::model::{Group, User};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while materializing the source snapshot.
///
/// All of these are fatal for the run: a partially populated snapshot must
/// never be reconciled against the provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source configuration could not be resolved before any directory I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// A directory API call failed; the snapshot is unusable.
    #[error("directory error: {0}")]
    Api(String),

    /// The configured filter resolved to no users and no groups.
    #[error("no users or groups resolved from the directory filter")]
    NoSubjects,
}

/// A populated, filtered snapshot of the source directory.
///
/// `populate` materializes the snapshot honoring the configured group
/// filter; the accessors then expose it in a deterministic order (users by
/// lower-cased email, groups by lower-cased name) so a fixed source yields
/// a fixed write sequence downstream. After a failed `populate` the
/// accessors observe whatever partial state exists and must not be
/// consulted.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Materialize the filtered users, groups, and membership.
    async fn populate(&mut self) -> Result<(), SourceError>;

    /// Filtered users, sorted by lower-cased email.
    fn users(&self) -> &[User];

    /// Filtered groups, sorted by lower-cased name.
    fn groups(&self) -> &[Group];
}
