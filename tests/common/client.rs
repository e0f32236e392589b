//! Test HTTP client.
//!
//! Sends requests with the gateway identity headers for one principal.

use reqwest::{Method, RequestBuilder, StatusCode};
use sanctiond::caps::Principal;
use serde_json::Value;

/// A client acting as one principal.
pub struct TestClient {
    http: reqwest::Client,
    base: String,
    principal: Principal,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(server: &super::TestServer, principal: Principal) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server.url(""),
            principal,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base, path))
            .header("x-actor-id", self.principal.id().to_string())
            .header("x-actor-role", self.principal.role().as_str());
        if let Principal::Moderator { community_id, .. } = self.principal {
            builder = builder.header("x-actor-community", community_id.to_string());
        }
        builder
    }

    /// Send and return status plus JSON body (`Null` when empty).
    async fn send(&self, builder: RequestBuilder) -> anyhow::Result<(StatusCode, Value)> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, body))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.send(self.request(Method::POST, path).json(&body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.send(self.request(Method::PUT, path).json(&body)).await
    }
}
