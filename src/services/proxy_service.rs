use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::football_data::{Upstream, UpstreamResponse};
use crate::config::StatusPolicy;
use crate::error::UpstreamError;
use crate::models::cache::{cache_key, ResponseCache};
use crate::models::in_flight::InFlight;

/// An inbound request with the local route prefix already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl ProxyRequest {
    pub fn new(method: Method, path: impl Into<String>, query: Option<String>) -> Self {
        let path = path.into();
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path },
            query,
        }
    }

    pub fn path_and_query(&self) -> String {
        cache_key(&self.path, self.query.as_deref())
    }
}

/// Forwards requests upstream, answering repeated GETs from the cache.
pub struct ProxyService {
    upstream: Arc<dyn Upstream>,
    cache: Arc<ResponseCache>,
    in_flight: InFlight,
    status_policy: StatusPolicy,
}

impl ProxyService {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        cache: Arc<ResponseCache>,
        status_policy: StatusPolicy,
    ) -> Self {
        Self {
            upstream,
            cache,
            in_flight: InFlight::new(),
            status_policy,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Resolves a request to the response the caller should see.
    ///
    /// Only GET is cached, and only when upstream answered 2xx. Concurrent
    /// misses for one key wait for the first to finish and then reuse its
    /// result.
    pub async fn forward(
        &self,
        request: &ProxyRequest,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let target = request.path_and_query();

        if request.method != Method::GET {
            let response = self.upstream.fetch(request.method.clone(), &target).await?;
            return Ok(self.apply_policy(response));
        }

        if let Some(body) = self.cache.get_valid(&target) {
            debug!("Cache hit for {}", target);
            return Ok(UpstreamResponse {
                status: StatusCode::OK,
                body,
            });
        }

        let _flight = self.in_flight.acquire(&target).await;
        if let Some(body) = self.cache.get_valid(&target) {
            debug!("Cache filled while waiting for {}", target);
            return Ok(UpstreamResponse {
                status: StatusCode::OK,
                body,
            });
        }

        debug!("Cache miss for {}", target);
        let response = self.upstream.fetch(Method::GET, &target).await?;
        info!("Upstream responded {} for {}", response.status, target);

        if response.status.is_success() {
            self.cache.put(target, response.body.clone());
        }
        Ok(self.apply_policy(response))
    }

    fn apply_policy(&self, response: UpstreamResponse) -> UpstreamResponse {
        match self.status_policy {
            StatusPolicy::Passthrough => response,
            StatusPolicy::Normalize => UpstreamResponse {
                status: StatusCode::OK,
                body: response.body,
            },
        }
    }
}
