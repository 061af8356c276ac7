//! SCIM 2.0 HTTP client: CRUD primitives with paginated list.

use crate::auth::ScimCredentials;
use crate::error::{ScimError, ScimResult};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Page size requested from the provider.
pub const PAGE_SIZE: i64 = 500;

/// Upper bound on list pages; a provider returning inconsistent
/// `totalResults`/`itemsPerPage` would otherwise never terminate.
pub const MAX_PAGES: usize = 20;

/// Maximum attempts for an idempotent GET hitting a 5xx.
const GET_ATTEMPTS: u32 = 3;

/// Default per-request timeout applied by [`ScimClient::new`] callers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin REST wrapper over a SCIM provider.
#[derive(Debug, Clone)]
pub struct ScimClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: ScimCredentials,
}

impl ScimClient {
    /// Build a client with its own HTTP transport and per-request timeout.
    pub fn new(
        base_url: &str,
        credentials: ScimCredentials,
        timeout: Duration,
    ) -> ScimResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScimError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(base_url, credentials, http)
    }

    /// Build a client over an existing HTTP transport (used by tests).
    pub fn with_http_client(
        base_url: &str,
        credentials: ScimCredentials,
        http: reqwest::Client,
    ) -> ScimResult<Self> {
        // A trailing slash makes relative resolution append path segments
        // instead of replacing the last one.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, resource_type: &str, resource_id: Option<&str>) -> ScimResult<Url> {
        match resource_id {
            None => Ok(self.base_url.join(resource_type)?),
            Some(id) => Ok(self
                .base_url
                .join(&format!("{resource_type}/"))?
                .join(id)?),
        }
    }

    fn resource_path(resource_type: &str, resource_id: Option<&str>) -> String {
        match resource_id {
            None => resource_type.to_string(),
            Some(id) => format!("{resource_type}/{id}"),
        }
    }

    /// Page through `resource_type` (`Users` or `Groups`), invoking the
    /// callback once per resource.
    ///
    /// Pagination uses 1-based `startIndex` with `count=500`; every page
    /// must carry `itemsPerPage`, `startIndex`, and `totalResults`.
    #[instrument(skip(self, on_each))]
    pub async fn get_resources(
        &self,
        resource_type: &str,
        mut on_each: impl FnMut(&Value),
    ) -> ScimResult<()> {
        let url = self.endpoint(resource_type, None)?;
        let mut start_index: i64 = 1;
        let mut pages = 0usize;
        loop {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(ScimError::PaginationCap(resource_type.to_string()));
            }

            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("startIndex", &start_index.to_string())
                .append_pair("count", &PAGE_SIZE.to_string());

            let page = self.get_with_retry(page_url, resource_type).await?;

            if let Some(resources) = page.get("Resources").and_then(Value::as_array) {
                for resource in resources {
                    on_each(resource);
                }
            }

            let items_per_page = int_field(&page, "itemsPerPage")?;
            start_index = int_field(&page, "startIndex")?;
            let total_results = int_field(&page, "totalResults")?;

            start_index += items_per_page;
            if start_index >= total_results {
                return Ok(());
            }
        }
    }

    /// Create a resource; returns the created resource as the provider
    /// echoed it back.
    #[instrument(skip(self, payload))]
    pub async fn post_resource(
        &self,
        resource_type: &str,
        payload: &impl Serialize,
    ) -> ScimResult<Value> {
        let url = self.endpoint(resource_type, None)?;
        let path = Self::resource_path(resource_type, None);
        let request = self
            .http
            .post(url)
            .bearer_auth(self.credentials.token())
            .json(payload);
        let body = self.execute(request, "POST", &path).await?;
        body.ok_or_else(|| ScimError::Protocol("created resource body".to_string()))
    }

    /// Apply a PATCH to a resource. An HTTP 204 with an empty body is a
    /// success.
    #[instrument(skip(self, payload))]
    pub async fn patch_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        payload: &impl Serialize,
    ) -> ScimResult<()> {
        let url = self.endpoint(resource_type, Some(resource_id))?;
        let path = Self::resource_path(resource_type, Some(resource_id));
        let request = self
            .http
            .patch(url)
            .bearer_auth(self.credentials.token())
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        self.execute(request, "PATCH", &path).await?;
        Ok(())
    }

    /// Delete a resource.
    #[instrument(skip(self))]
    pub async fn delete_resource(&self, resource_type: &str, resource_id: &str) -> ScimResult<()> {
        let url = self.endpoint(resource_type, Some(resource_id))?;
        let path = Self::resource_path(resource_type, Some(resource_id));
        let request = self.http.delete(url).bearer_auth(self.credentials.token());
        self.execute(request, "DELETE", &path).await?;
        Ok(())
    }

    /// GET one page, retrying on 5xx with exponential backoff.
    async fn get_with_retry(&self, url: Url, resource_type: &str) -> ScimResult<Value> {
        let mut attempt = 0u32;
        let mut delay = Duration::from_secs(1);
        loop {
            attempt += 1;
            let request = self
                .http
                .get(url.clone())
                .bearer_auth(self.credentials.token());
            match self.execute(request, "GET", resource_type).await {
                Ok(body) => return Ok(body.unwrap_or(Value::Null)),
                Err(err) => {
                    let retryable = matches!(&err, ScimError::Api { status, .. } if *status >= 500);
                    if retryable && attempt < GET_ATTEMPTS {
                        warn!(
                            resource_type,
                            attempt,
                            error = %err,
                            "transient SCIM list failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Send a request and interpret the response per the SCIM contract:
    /// status >= 300 is an error carrying the body when the content type
    /// is `application/*`; an empty successful body yields `None`.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        path: &str,
    ) -> ScimResult<Option<Value>> {
        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = if content_type.starts_with("application/") {
            response.text().await?
        } else {
            String::new()
        };

        if status.as_u16() >= 300 {
            let detail = if body.is_empty() {
                format!("Status code {}", status.as_u16())
            } else {
                body
            };
            return Err(ScimError::Api {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        debug!(method, path, status = status.as_u16(), "SCIM request complete");

        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(serde_json::from_str(&body)?))
        }
    }
}

/// Extract a pagination attribute, tolerating numeric strings the way
/// some providers emit them. Absence is a protocol error.
fn int_field(page: &Value, field: &str) -> ScimResult<i64> {
    let value = match page.get(field) {
        Some(value) => value,
        None => return Err(ScimError::Protocol(field.to_string())),
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| ScimError::Protocol(field.to_string())),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| ScimError::Protocol(field.to_string())),
        _ => Err(ScimError::Protocol(field.to_string())),
    }
}
