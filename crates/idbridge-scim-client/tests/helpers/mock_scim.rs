//! A wiremock-backed SCIM provider.

#![allow(dead_code)]

use super::test_data::list_response;
use idbridge_scim_client::{ScimClient, ScimCredentials};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bearer token every test client sends.
pub const TEST_TOKEN: &str = "test-token";

/// Mock SCIM provider with canned list responses; write expectations are
/// mounted by each test directly on [`MockScim::server`].
pub struct MockScim {
    pub server: MockServer,
}

impl MockScim {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// A client pointed at the mock provider.
    pub fn client(&self) -> ScimClient {
        ScimClient::with_http_client(
            &self.server.uri(),
            ScimCredentials::bearer(TEST_TOKEN),
            reqwest::Client::new(),
        )
        .expect("mock client")
    }

    /// Serve these User resources as a single list page.
    pub async fn given_users(&self, resources: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/Users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_response(resources)))
            .mount(&self.server)
            .await;
    }

    /// Serve these Group resources as a single list page.
    pub async fn given_groups(&self, resources: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/Groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_response(resources)))
            .mount(&self.server)
            .await;
    }
}
