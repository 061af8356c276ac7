//! Snapshot population: filter resolution and transitive membership
//! expansion over the Workspace directory.

use crate::auth::{ServiceAccountKey, TokenCache};
use crate::client::{ApiUser, DirectoryClient};
use crate::error::DirectoryError;
use async_trait::async_trait;
use idbridge_core::{DirectorySource, Group, GroupFilter, SourceError, User};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Google Workspace implementation of [`DirectorySource`].
///
/// `populate` lists all users and groups once, resolves the configured
/// group filter into a set of root groups, then walks nested membership
/// breadth-first. Each group's member list is fetched at most once per
/// run, and a per-walk visited set terminates cyclic nesting — directory
/// services do permit cycles in practice.
pub struct GoogleDirectory {
    client: DirectoryClient,
    scim_groups: Vec<String>,
    users: Vec<User>,
    groups: Vec<Group>,
}

impl GoogleDirectory {
    /// Wrap an existing client (used by tests).
    pub fn new(client: DirectoryClient, scim_groups: Vec<String>) -> Self {
        Self {
            client,
            scim_groups,
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Build the adapter from raw `credentials.json` bytes and the admin
    /// subject to impersonate.
    pub fn connect(
        credentials: &[u8],
        admin_account: &str,
        scim_groups: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let key = ServiceAccountKey::from_json(credentials)?;
        let tokens = Arc::new(TokenCache::new(key, admin_account));
        let client = DirectoryClient::new(tokens, timeout)?;
        Ok(Self::new(client, scim_groups))
    }

    #[instrument(skip(self), fields(filter_entries = self.scim_groups.len()))]
    async fn populate_snapshot(&mut self) -> Result<(), SourceError> {
        let filter = GroupFilter::parse(&self.scim_groups)?;

        let api_users = self.client.list_users().await.map_err(SourceError::from)?;
        let all_users: HashMap<String, User> = api_users
            .iter()
            .map(|u| (u.id.clone(), map_user(u)))
            .collect();

        let api_groups = self.client.list_groups().await.map_err(SourceError::from)?;

        // In-scope roots: groups whose email or name matches a filter
        // token. Only roots are exported; nested groups merely contribute
        // members.
        let mut roots: Vec<Group> = api_groups
            .iter()
            .filter(|g| filter.matches(&g.name, &g.email))
            .map(|g| Group {
                id: g.id.clone(),
                name: g.name.clone(),
            })
            .collect();
        roots.sort_by(|a, b| {
            (a.name.to_lowercase(), &a.id).cmp(&(b.name.to_lowercase(), &b.id))
        });

        let mut member_cache: HashMap<String, Vec<crate::client::ApiMember>> = HashMap::new();
        let mut exported_users: HashMap<String, User> = HashMap::new();

        for root in &roots {
            let mut visited: HashSet<String> = HashSet::new();
            let mut queue: VecDeque<String> = VecDeque::new();
            visited.insert(root.id.clone());
            queue.push_back(root.id.clone());

            while let Some(group_id) = queue.pop_front() {
                let members = match member_cache.get(&group_id) {
                    Some(members) => members.clone(),
                    None => {
                        let fetched = self
                            .client
                            .list_members(&group_id)
                            .await
                            .map_err(SourceError::from)?;
                        member_cache.insert(group_id.clone(), fetched.clone());
                        fetched
                    }
                };

                for member in &members {
                    let Some(member_id) = &member.id else { continue };
                    if member.is_group() {
                        if visited.insert(member_id.clone()) {
                            queue.push_back(member_id.clone());
                        }
                    } else if member.is_user() {
                        // Members outside the customer's user list (for
                        // example external addresses) are not exported.
                        let Some(user) = all_users.get(member_id) else {
                            continue;
                        };
                        let entry = exported_users
                            .entry(member_id.clone())
                            .or_insert_with(|| user.clone());
                        if !entry.groups.contains(&root.id) {
                            entry.groups.push(root.id.clone());
                        }
                    }
                }
            }
        }

        let mut users: Vec<User> = exported_users.into_values().collect();
        users.sort_by(|a, b| {
            (a.email.to_lowercase(), &a.id).cmp(&(b.email.to_lowercase(), &b.id))
        });

        if users.is_empty() && roots.is_empty() {
            return Err(SourceError::NoSubjects);
        }

        info!(
            users = users.len(),
            groups = roots.len(),
            filter_tokens = filter.len(),
            "directory snapshot populated"
        );

        self.users = users;
        self.groups = roots;
        Ok(())
    }
}

fn map_user(api: &ApiUser) -> User {
    let (first_name, last_name, full_name) = match &api.name {
        Some(name) => {
            let full = if name.full_name.is_empty() {
                User::derived_full_name(&name.given_name, &name.family_name)
            } else {
                name.full_name.clone()
            };
            (name.given_name.clone(), name.family_name.clone(), full)
        }
        None => (String::new(), String::new(), String::new()),
    };
    User {
        id: api.id.clone(),
        email: api.primary_email.clone(),
        full_name,
        first_name,
        last_name,
        active: !api.suspended,
        groups: Vec::new(),
    }
}

#[async_trait]
impl DirectorySource for GoogleDirectory {
    async fn populate(&mut self) -> Result<(), SourceError> {
        self.populate_snapshot().await
    }

    fn users(&self) -> &[User] {
        &self.users
    }

    fn groups(&self) -> &[Group] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiUserName;

    #[test]
    fn test_map_user_prefers_supplied_full_name() {
        let api = ApiUser {
            id: "u1".to_string(),
            primary_email: "alice@x.y".to_string(),
            suspended: false,
            name: Some(ApiUserName {
                given_name: "Alice".to_string(),
                family_name: "Adams".to_string(),
                full_name: "Alice the Admin".to_string(),
            }),
        };
        let user = map_user(&api);
        assert_eq!(user.full_name, "Alice the Admin");
        assert!(user.active);
    }

    #[test]
    fn test_map_user_derives_missing_full_name() {
        let api = ApiUser {
            id: "u1".to_string(),
            primary_email: "alice@x.y".to_string(),
            suspended: true,
            name: Some(ApiUserName {
                given_name: "Alice".to_string(),
                family_name: "Adams".to_string(),
                full_name: String::new(),
            }),
        };
        let user = map_user(&api);
        assert_eq!(user.full_name, "Alice Adams");
        assert!(!user.active);
    }
}
