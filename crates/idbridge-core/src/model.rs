//! Directory entities produced by a source adapter.

use serde::{Deserialize, Serialize};

/// A directory user after filtering and transitive group expansion.
///
/// Lives for the duration of one run; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque source identifier, stable within a run.
    pub id: String,

    /// Primary email. Doubles as the SCIM `userName` and as the
    /// case-insensitive fallback matching key across systems.
    pub email: String,

    /// Display name.
    pub full_name: String,

    pub first_name: String,

    pub last_name: String,

    pub active: bool,

    /// Ids of the in-scope groups this user belongs to, after transitive
    /// expansion. Every entry refers to a group present in the same
    /// snapshot.
    pub groups: Vec<String>,
}

impl User {
    /// Fallback display name when the source does not supply one.
    pub fn derived_full_name(first_name: &str, last_name: &str) -> String {
        format!("{first_name} {last_name}").trim().to_string()
    }
}

/// A directory group named by the sync filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Opaque source identifier.
    pub id: String,

    /// Display name, exported as the SCIM `displayName`.
    pub name: String,
}
