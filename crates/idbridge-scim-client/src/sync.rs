//! The reconciliation engine.
//!
//! Diffs a populated directory snapshot against the SCIM provider and
//! issues the minimum correct sequence of creates, patches, and deletes,
//! in three strictly ordered phases: users, groups, membership — followed
//! by an optional destructive pass that removes provider entities absent
//! from the source. Individual write failures never abort the run; they
//! land in the tally and the engine moves on.

use crate::client::ScimClient;
use crate::error::{ScimError, ScimResult};
use crate::model::{
    self, group_create_payload, group_diff_ops, user_create_payload, user_diff_ops, PatchOp,
    PatchRequest, ScimGroup, ScimUser,
};
use idbridge_core::{DirectorySource, Group, SyncStat, User};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One-shot diff-and-apply run against a SCIM provider.
///
/// Construct, optionally flip `verbose`/`destructive`, then call
/// [`ScimSync::sync`] once. After a cancelled or failed run the partial
/// tally remains readable through [`ScimSync::stat`].
pub struct ScimSync<S: DirectorySource> {
    source: S,
    client: ScimClient,
    verbose: bool,
    destructive: bool,
    cancel: CancellationToken,

    // Provider snapshot, indexed by SCIM id. Kept current as the run
    // creates and patches resources so later phases observe the writes.
    scim_users: BTreeMap<String, ScimUser>,
    scim_groups: BTreeMap<String, ScimGroup>,

    // Source id -> SCIM id mappings established during phases 1 and 2.
    user_map: HashMap<String, String>,
    group_map: HashMap<String, String>,

    // SCIM ids claimed by some source entity; everything else is an
    // orphan candidate for the destructive pass.
    matched_users: HashSet<String>,
    matched_groups: HashSet<String>,

    stat: SyncStat,
}

impl<S: DirectorySource> ScimSync<S> {
    pub fn new(source: S, client: ScimClient) -> Self {
        Self {
            source,
            client,
            verbose: false,
            destructive: false,
            cancel: CancellationToken::new(),
            scim_users: BTreeMap::new(),
            scim_groups: BTreeMap::new(),
            user_map: HashMap::new(),
            group_map: HashMap::new(),
            matched_users: HashSet::new(),
            matched_groups: HashSet::new(),
            stat: SyncStat::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn destructive(&self) -> bool {
        self.destructive
    }

    pub fn set_destructive(&mut self, destructive: bool) {
        self.destructive = destructive;
    }

    /// Token the driver can trip to stop the run between HTTP requests.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The tally accumulated so far. Complete after a successful run,
    /// partial after a cancelled or aborted one.
    pub fn stat(&self) -> &SyncStat {
        &self.stat
    }

    /// Run one full reconciliation and return the tally.
    ///
    /// Fatal errors (source population, SCIM snapshot listing,
    /// cancellation) abort the run; per-entity write failures are recorded
    /// and the run continues.
    pub async fn sync(&mut self) -> ScimResult<SyncStat> {
        self.stat = SyncStat::default();
        self.user_map.clear();
        self.group_map.clear();
        self.matched_users.clear();
        self.matched_groups.clear();

        self.source.populate().await?;
        info!(
            users = self.source.users().len(),
            groups = self.source.groups().len(),
            "source snapshot populated"
        );

        self.populate_scim().await?;
        info!(
            users = self.scim_users.len(),
            groups = self.scim_groups.len(),
            "SCIM snapshot populated"
        );

        self.sync_users().await?;
        self.sync_groups().await?;
        self.sync_membership().await?;

        if self.destructive {
            self.delete_orphans().await?;
        }

        Ok(std::mem::take(&mut self.stat))
    }

    fn ensure_active(&self) -> ScimResult<()> {
        if self.cancel.is_cancelled() {
            Err(ScimError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Snapshot the provider's Groups and Users.
    async fn populate_scim(&mut self) -> ScimResult<()> {
        self.ensure_active()?;
        let mut groups = BTreeMap::new();
        self.client
            .get_resources("Groups", |resource| {
                if let Some(group) = model::parse_group(resource) {
                    groups.insert(group.id.clone(), group);
                }
            })
            .await?;

        self.ensure_active()?;
        let mut users = BTreeMap::new();
        self.client
            .get_resources("Users", |resource| {
                if let Some(user) = model::parse_user(resource) {
                    users.insert(user.id.clone(), user);
                }
            })
            .await?;

        self.scim_groups = groups;
        self.scim_users = users;
        Ok(())
    }

    // ── Phase 1: users ───────────────────────────────────────────────

    async fn sync_users(&mut self) -> ScimResult<()> {
        let mut by_external: HashMap<String, String> = HashMap::new();
        let mut by_email: HashMap<String, String> = HashMap::new();
        for (id, user) in &self.scim_users {
            if !user.external_id.is_empty() {
                by_external.insert(user.external_id.clone(), id.clone());
            }
            by_email
                .entry(user.email.to_lowercase())
                .or_insert_with(|| id.clone());
        }

        let users: Vec<User> = self.source.users().to_vec();
        let mut seen_emails: HashSet<String> = HashSet::new();
        for user in &users {
            let email_key = user.email.to_lowercase();
            if !seen_emails.insert(email_key.clone()) {
                self.stat
                    .failed_users
                    .push(format!("{}: duplicate email", user.email));
                continue;
            }

            let matched = by_external
                .get(&user.id)
                .or_else(|| by_email.get(&email_key))
                .cloned();
            match matched {
                Some(scim_id) => self.update_user(&scim_id, user).await?,
                None => {
                    if let Some(scim_id) = self.create_user(user).await? {
                        by_external.insert(user.id.clone(), scim_id.clone());
                        by_email.insert(email_key, scim_id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn create_user(&mut self, user: &User) -> ScimResult<Option<String>> {
        self.ensure_active()?;
        let payload = user_create_payload(user);
        match self.client.post_resource("Users", &payload).await {
            Ok(resource) => match model::parse_user(&resource) {
                Some(created) => {
                    let scim_id = created.id.clone();
                    self.scim_users.insert(scim_id.clone(), created);
                    self.user_map.insert(user.id.clone(), scim_id.clone());
                    self.matched_users.insert(scim_id.clone());
                    let entry = self.success_entry(&user.email, None, Some(&payload));
                    self.stat.success_users.push(entry);
                    Ok(Some(scim_id))
                }
                None => {
                    let entry =
                        format!("{}: create returned an unusable resource", user.email);
                    self.stat.failed_users.push(entry);
                    Ok(None)
                }
            },
            Err(ScimError::Cancelled) => Err(ScimError::Cancelled),
            Err(err) => {
                warn!(email = %user.email, error = %err, "user create failed");
                let entry = self.failure_entry(&user.email, "create", &err);
                self.stat.failed_users.push(entry);
                Ok(None)
            }
        }
    }

    async fn update_user(&mut self, scim_id: &str, user: &User) -> ScimResult<()> {
        self.user_map.insert(user.id.clone(), scim_id.to_string());
        self.matched_users.insert(scim_id.to_string());

        let Some(existing) = self.scim_users.get(scim_id).cloned() else {
            // Index and snapshot are built together; a miss here means a
            // bug upstream, not a provider condition.
            let entry = format!("{}: SCIM snapshot is missing {scim_id}", user.email);
            self.stat.failed_users.push(entry);
            return Ok(());
        };

        let ops = user_diff_ops(user, &existing);
        if ops.is_empty() {
            let entry = self.success_entry(&user.email, Some("unchanged"), None);
            self.stat.success_users.push(entry);
            return Ok(());
        }

        self.ensure_active()?;
        let request = PatchRequest::new(ops);
        match self.client.patch_resource("Users", scim_id, &request).await {
            Ok(()) => {
                if let Some(entry) = self.scim_users.get_mut(scim_id) {
                    entry.email = user.email.clone();
                    entry.external_id = user.id.clone();
                    entry.active = user.active;
                    entry.first_name = user.first_name.clone();
                    entry.last_name = user.last_name.clone();
                    entry.full_name = user.full_name.clone();
                }
                let body = serde_json::to_value(&request).unwrap_or_default();
                let entry = self.success_entry(&user.email, Some("updated"), Some(&body));
                self.stat.success_users.push(entry);
            }
            Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
            Err(err) => {
                warn!(email = %user.email, error = %err, "user update failed");
                let entry = self.failure_entry(&user.email, "update", &err);
                self.stat.failed_users.push(entry);
            }
        }
        Ok(())
    }

    // ── Phase 2: groups ──────────────────────────────────────────────

    async fn sync_groups(&mut self) -> ScimResult<()> {
        let mut by_external: HashMap<String, String> = HashMap::new();
        let mut by_name: HashMap<String, String> = HashMap::new();
        for (id, group) in &self.scim_groups {
            if !group.external_id.is_empty() {
                by_external.insert(group.external_id.clone(), id.clone());
            }
            by_name
                .entry(group.name.to_lowercase())
                .or_insert_with(|| id.clone());
        }

        let groups: Vec<Group> = self.source.groups().to_vec();
        for group in &groups {
            let matched = by_external
                .get(&group.id)
                .or_else(|| by_name.get(&group.name.to_lowercase()))
                .cloned();
            match matched {
                Some(scim_id) => self.update_group(&scim_id, group).await?,
                None => self.create_group(group).await?,
            }
        }
        Ok(())
    }

    async fn create_group(&mut self, group: &Group) -> ScimResult<()> {
        self.ensure_active()?;
        let payload = group_create_payload(group);
        match self.client.post_resource("Groups", &payload).await {
            Ok(resource) => match model::parse_group(&resource) {
                Some(created) => {
                    let scim_id = created.id.clone();
                    self.scim_groups.insert(scim_id.clone(), created);
                    self.group_map.insert(group.id.clone(), scim_id.clone());
                    self.matched_groups.insert(scim_id);
                    let entry = self.success_entry(&group.name, None, Some(&payload));
                    self.stat.success_groups.push(entry);
                }
                None => {
                    let entry =
                        format!("{}: create returned an unusable resource", group.name);
                    self.stat.failed_groups.push(entry);
                }
            },
            Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
            Err(err) => {
                warn!(group = %group.name, error = %err, "group create failed");
                let entry = self.failure_entry(&group.name, "create", &err);
                self.stat.failed_groups.push(entry);
            }
        }
        Ok(())
    }

    async fn update_group(&mut self, scim_id: &str, group: &Group) -> ScimResult<()> {
        self.group_map.insert(group.id.clone(), scim_id.to_string());
        self.matched_groups.insert(scim_id.to_string());

        let Some(existing) = self.scim_groups.get(scim_id).cloned() else {
            let entry = format!("{}: SCIM snapshot is missing {scim_id}", group.name);
            self.stat.failed_groups.push(entry);
            return Ok(());
        };

        let ops = group_diff_ops(group, &existing);
        if ops.is_empty() {
            let entry = self.success_entry(&group.name, Some("unchanged"), None);
            self.stat.success_groups.push(entry);
            return Ok(());
        }

        self.ensure_active()?;
        let request = PatchRequest::new(ops);
        match self
            .client
            .patch_resource("Groups", scim_id, &request)
            .await
        {
            Ok(()) => {
                if let Some(entry) = self.scim_groups.get_mut(scim_id) {
                    entry.name = group.name.clone();
                    entry.external_id = group.id.clone();
                }
                let body = serde_json::to_value(&request).unwrap_or_default();
                let entry = self.success_entry(&group.name, Some("updated"), Some(&body));
                self.stat.success_groups.push(entry);
            }
            Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
            Err(err) => {
                warn!(group = %group.name, error = %err, "group update failed");
                let entry = self.failure_entry(&group.name, "update", &err);
                self.stat.failed_groups.push(entry);
            }
        }
        Ok(())
    }

    // ── Phase 3: membership ──────────────────────────────────────────

    async fn sync_membership(&mut self) -> ScimResult<()> {
        let groups: Vec<Group> = self.source.groups().to_vec();
        let users: Vec<User> = self.source.users().to_vec();

        for group in &groups {
            let Some(scim_group_id) = self.group_map.get(&group.id).cloned() else {
                // Group provisioning failed; its membership cannot be
                // reconciled this run.
                self.stat
                    .failed_membership
                    .push(format!("{}: skipped", group.name));
                continue;
            };

            let mut desired: BTreeSet<String> = BTreeSet::new();
            let mut unmapped: Vec<&str> = Vec::new();
            for user in &users {
                if !user.groups.iter().any(|g| g == &group.id) {
                    continue;
                }
                match self.user_map.get(&user.id) {
                    Some(scim_user_id) => {
                        desired.insert(scim_user_id.clone());
                    }
                    None => unmapped.push(user.email.as_str()),
                }
            }

            // Members whose user provisioning failed cascade here; the
            // remaining members are still reconciled.
            for email in &unmapped {
                self.stat
                    .failed_membership
                    .push(format!("{}: skipped ({email})", group.name));
            }

            let current: BTreeSet<String> = self
                .scim_groups
                .get(&scim_group_id)
                .map(|g| g.members.iter().cloned().collect())
                .unwrap_or_default();

            let additions: Vec<String> = desired.difference(&current).cloned().collect();
            let removals: Vec<String> = current.difference(&desired).cloned().collect();

            if additions.is_empty() && removals.is_empty() {
                if unmapped.is_empty() {
                    self.stat
                        .success_membership
                        .push(format!("{}: unchanged", group.name));
                }
                continue;
            }

            let mut ops: Vec<PatchOp> = Vec::new();
            if !additions.is_empty() {
                let values: Vec<serde_json::Value> = additions
                    .iter()
                    .map(|scim_id| json!({ "value": scim_id }))
                    .collect();
                ops.push(PatchOp::add("members", json!(values)));
            }
            for scim_id in &removals {
                ops.push(PatchOp::remove(format!("members[value eq \"{scim_id}\"]")));
            }

            self.ensure_active()?;
            let request = PatchRequest::new(ops);
            let summary = format!("{}: +{} -{}", group.name, additions.len(), removals.len());
            match self
                .client
                .patch_resource("Groups", &scim_group_id, &request)
                .await
            {
                Ok(()) => {
                    if let Some(entry) = self.scim_groups.get_mut(&scim_group_id) {
                        entry.members = desired.iter().cloned().collect();
                    }
                    let entry = if self.verbose {
                        let body = serde_json::to_string(&request).unwrap_or_default();
                        format!("{summary}: {body}")
                    } else {
                        summary
                    };
                    self.stat.success_membership.push(entry);
                }
                Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
                Err(err) => {
                    warn!(group = %group.name, error = %err, "membership update failed");
                    let entry = if self.verbose {
                        format!("{summary}: {err}")
                    } else {
                        summary
                    };
                    self.stat.failed_membership.push(entry);
                }
            }
        }
        Ok(())
    }

    // ── Destructive pass ─────────────────────────────────────────────

    /// Delete provider users and groups with no match in the source
    /// snapshot. Only runs when the destructive flag is set.
    async fn delete_orphans(&mut self) -> ScimResult<()> {
        let orphan_users: Vec<ScimUser> = self
            .scim_users
            .values()
            .filter(|u| !self.matched_users.contains(&u.id))
            .cloned()
            .collect();
        for user in orphan_users {
            self.ensure_active()?;
            match self.client.delete_resource("Users", &user.id).await {
                Ok(()) => {
                    self.scim_users.remove(&user.id);
                    self.stat
                        .success_users
                        .push(format!("{} (deleted)", user.email));
                }
                Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
                Err(err) => {
                    warn!(email = %user.email, error = %err, "orphan user delete failed");
                    let entry = self.failure_entry(&user.email, "delete", &err);
                    self.stat.failed_users.push(entry);
                }
            }
        }

        let orphan_groups: Vec<ScimGroup> = self
            .scim_groups
            .values()
            .filter(|g| !self.matched_groups.contains(&g.id))
            .cloned()
            .collect();
        for group in orphan_groups {
            self.ensure_active()?;
            match self.client.delete_resource("Groups", &group.id).await {
                Ok(()) => {
                    self.scim_groups.remove(&group.id);
                    self.stat
                        .success_groups
                        .push(format!("{} (deleted)", group.name));
                }
                Err(ScimError::Cancelled) => return Err(ScimError::Cancelled),
                Err(err) => {
                    warn!(group = %group.name, error = %err, "orphan group delete failed");
                    let entry = self.failure_entry(&group.name, "delete", &err);
                    self.stat.failed_groups.push(entry);
                }
            }
        }
        Ok(())
    }

    // ── Tally entry formatting ───────────────────────────────────────

    fn success_entry(
        &self,
        subject: &str,
        note: Option<&str>,
        payload: Option<&serde_json::Value>,
    ) -> String {
        let mut entry = subject.to_string();
        if let Some(note) = note {
            entry.push_str(&format!(" ({note})"));
        }
        if self.verbose {
            if let Some(payload) = payload {
                entry.push_str(&format!(": {payload}"));
            }
        }
        entry
    }

    fn failure_entry(&self, subject: &str, action: &str, err: &ScimError) -> String {
        if self.verbose {
            format!("{subject}: {action} failed: {err}")
        } else {
            format!("{subject}: {action} failed")
        }
    }
}
