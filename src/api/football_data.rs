use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::UpstreamError;

pub const AUTH_HEADER: &str = "X-Auth-Token";

/// A decoded upstream reply. Non-2xx replies with a JSON body still land
/// here; deciding what to do with their status is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issues `method` against `path_and_query` (already stripped of the
    /// local route prefix) and decodes the JSON body.
    async fn fetch(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

pub struct FootballDataApi {
    client: Client,
    base_url: String,
    api_key: HeaderValue,
}

impl FootballDataApi {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(UpstreamError::Client)?;

        let mut api_key =
            HeaderValue::from_str(api_key).map_err(|_| UpstreamError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

#[async_trait]
impl Upstream for FootballDataApi {
    async fn fetch(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.target_url(path_and_query);
        debug!("Forwarding {} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .header(AUTH_HEADER, self.api_key.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|source| UpstreamError::Decode { status, source })?;

        debug!("Upstream answered {} for {}", status, url);
        Ok(UpstreamResponse { status, body })
    }
}
