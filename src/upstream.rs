//! Upstream HTTP boundary.
//!
//! The page realm talks to the platform's endpoints through this trait so
//! strategies stay testable without a network. The production implementation
//! rides the host page's session: requests go out with whatever credentials
//! ambient cookies provide, no authentication of its own.

use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// POST a JSON body and parse the JSON response.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Value,
    ) -> Result<Value, FetchError>;

    /// GET a raw text body (caption track URLs).
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `reqwest`-backed client.
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Value,
    ) -> Result<Value, FetchError> {
        let mut request = self.client.post(url).json(&body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| FetchError::Body(err.to_string()))
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|err| FetchError::Body(err.to_string()))
    }
}
