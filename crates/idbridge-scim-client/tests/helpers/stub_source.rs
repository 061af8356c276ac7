//! An in-memory directory source for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use idbridge_core::{DirectorySource, Group, SourceError, User};

/// Directory source serving a fixed snapshot, with optional populate
/// failure injection.
#[derive(Default)]
pub struct StubSource {
    users: Vec<User>,
    groups: Vec<Group>,
    fail: Option<SourceError>,
}

impl StubSource {
    pub fn new(users: Vec<User>, groups: Vec<Group>) -> Self {
        Self {
            users,
            groups,
            fail: None,
        }
    }

    /// Fail the next populate with this error.
    pub fn failing(error: SourceError) -> Self {
        Self {
            fail: Some(error),
            ..Self::default()
        }
    }
}

#[async_trait]
impl DirectorySource for StubSource {
    async fn populate(&mut self) -> Result<(), SourceError> {
        if let Some(error) = self.fail.take() {
            return Err(error);
        }
        // Same deterministic order the real adapter guarantees.
        self.users.sort_by(|a, b| {
            (a.email.to_lowercase(), &a.id).cmp(&(b.email.to_lowercase(), &b.id))
        });
        self.groups.sort_by(|a, b| {
            (a.name.to_lowercase(), &a.id).cmp(&(b.name.to_lowercase(), &b.id))
        });
        Ok(())
    }

    fn users(&self) -> &[User] {
        &self.users
    }

    fn groups(&self) -> &[Group] {
        &self.groups
    }
}
