//! Admin SDK Directory REST client.
//!
//! Read-only listing of users, groups, and group members with `pageToken`
//! pagination. All calls are scoped to the customer of the impersonated
//! admin (`customer=my_customer`).

use crate::auth::TokenProvider;
use crate::error::DirectoryError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Admin SDK Directory API base.
pub const DEFAULT_BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1/";

/// `maxResults` caps per the Admin SDK: 500 for users, 200 for groups and
/// members.
const USERS_PAGE_SIZE: u32 = 500;
const GROUPS_PAGE_SIZE: u32 = 200;
const MEMBERS_PAGE_SIZE: u32 = 200;

/// A Workspace user as the API returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub id: String,
    pub primary_email: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub name: Option<ApiUserName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserName {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub full_name: String,
}

/// A Workspace group as the API returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// A group member; `type` distinguishes users from nested groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: String,
}

impl ApiMember {
    pub fn is_user(&self) -> bool {
        self.member_type.eq_ignore_ascii_case("USER")
    }

    pub fn is_group(&self) -> bool {
        self.member_type.eq_ignore_ascii_case("GROUP")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersPage {
    #[serde(default)]
    users: Vec<ApiUser>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    groups: Vec<ApiGroup>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<ApiMember>,
    next_page_token: Option<String>,
}

/// Directory API client.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl DirectoryClient {
    /// Build a client against the production API.
    pub fn new(tokens: Arc<dyn TokenProvider>, timeout: Duration) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_base_url(tokens, DEFAULT_BASE_URL, http)
    }

    /// Build a client against an arbitrary base URL (used by tests).
    pub fn with_base_url(
        tokens: Arc<dyn TokenProvider>,
        base_url: &str,
        http: reqwest::Client,
    ) -> Result<Self, DirectoryError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            tokens,
        })
    }

    /// List every user of the customer.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<ApiUser>, DirectoryError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.base_url.join("users")?;
            url.query_pairs_mut()
                .append_pair("customer", "my_customer")
                .append_pair("maxResults", &USERS_PAGE_SIZE.to_string());
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: UsersPage = self.get_json(url).await?;
            users.extend(page.users);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(count = users.len(), "listed directory users");
        Ok(users)
    }

    /// List every group of the customer.
    #[instrument(skip(self))]
    pub async fn list_groups(&self) -> Result<Vec<ApiGroup>, DirectoryError> {
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.base_url.join("groups")?;
            url.query_pairs_mut()
                .append_pair("customer", "my_customer")
                .append_pair("maxResults", &GROUPS_PAGE_SIZE.to_string());
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: GroupsPage = self.get_json(url).await?;
            groups.extend(page.groups);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(count = groups.len(), "listed directory groups");
        Ok(groups)
    }

    /// List the direct members of one group.
    #[instrument(skip(self))]
    pub async fn list_members(&self, group_id: &str) -> Result<Vec<ApiMember>, DirectoryError> {
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.base_url.join(&format!("groups/{group_id}/members"))?;
            url.query_pairs_mut()
                .append_pair("maxResults", &MEMBERS_PAGE_SIZE.to_string());
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: MembersPage = self.get_json(url).await?;
            members.extend(page.members);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(members)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DirectoryError> {
        let token = self.tokens.token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
