// GitHub API HTTP client: the access layer composition root.
// Wires authentication, the shared call budget, and the response cache into
// one object that collectors use instead of raw requests.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::cache::CacheManager;
use crate::config::{Config, GITHUB_API_URL, GITHUB_GRAPHQL_URL};
use crate::error::{Error, Result};
use crate::limiter::{RateBudget, RateLimiter};

use super::types::ServerRateLimit;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Build the cache key for an operation and its positional arguments.
///
/// Same operation with the same arguments in the same order always yields the
/// same key. Every argument that affects the result must be listed, otherwise
/// two different calls collide on one entry.
pub fn cache_key(operation: &str, args: &[&str]) -> String {
    format!("{}:{}", operation, args.join(":"))
}

/// GitHub API client with caching and client-side rate limiting.
///
/// Holds shared handles to one [`RateLimiter`] and one [`CacheManager`];
/// several clients constructed over the same handles share a single call
/// budget and cache, which is the intended setup for one API token.
pub struct GitHubClient {
    http: Client,
    limiter: Arc<RateLimiter>,
    cache: Arc<CacheManager>,
    server_limit: Mutex<ServerRateLimit>,
}

impl GitHubClient {
    /// Create a client over externally constructed limiter and cache handles.
    pub fn new(token: &str, limiter: Arc<RateLimiter>, cache: Arc<CacheManager>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Other(e.to_string()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("hubgate"));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(Error::Api)?;

        Ok(Self {
            http,
            limiter,
            cache,
            server_limit: Mutex::new(ServerRateLimit::default()),
        })
    }

    /// Create a client plus its limiter and cache from configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(RateBudget {
            max_calls: config.api_rate_limit,
            window: config.rate_window,
        }));
        let cache = Arc::new(CacheManager::connect(config).await);
        Self::new(&config.github_token, limiter, cache)
    }

    /// Create a client from the environment (`GITHUB_TOKEN` et al.).
    pub async fn from_env() -> Result<Self> {
        Self::connect(&Config::from_env()?).await
    }

    /// The shared call budget.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The shared response cache.
    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Calls left in the client-side budget window.
    pub fn remaining_budget(&self) -> usize {
        self.limiter.remaining()
    }

    /// Wall-clock time at which the client-side budget replenishes.
    pub fn budget_reset_time(&self) -> DateTime<Utc> {
        self.limiter.reset_at()
    }

    /// Last server-reported rate limit state.
    pub fn server_rate_limit(&self) -> ServerRateLimit {
        *self.server_limit.lock().unwrap()
    }

    /// Memoize an async fetch through the response cache.
    ///
    /// A live cached value is returned without touching the network or the
    /// call budget. On a miss, `op` runs (awaiting budget admission through
    /// the transport it uses), its result is stored for `ttl`, and the value
    /// is returned. Errors from `op` propagate unchanged and leave no cache
    /// entry; a cached payload that no longer decodes is treated as a miss.
    pub async fn fetch_cached<T, F, Fut>(&self, key: &str, ttl: Duration, op: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(text) = self.cache.get(key).await {
            match serde_json::from_str(&text) {
                Ok(value) => return Ok(value),
                Err(err) => debug!("cached payload for {key:?} undecodable, refetching: {err}"),
            }
        }

        let value = op().await?;

        match serde_json::to_string(&value) {
            Ok(text) => self.cache.set(key, text, Some(ttl)).await,
            Err(err) => warn!("result for {key:?} not cacheable: {err}"),
        }

        Ok(value)
    }

    /// Make a budget-gated GET request to the GitHub API.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.limiter.admit().await;

        let url = format!("{}{}", GITHUB_API_URL, endpoint);
        let response = self.http.get(&url).send().await.map_err(Error::Api)?;

        self.update_server_limit(&response);
        self.check_response(response).await
    }

    /// Make a budget-gated GET request with query parameters.
    pub async fn get_with_params<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: &T,
    ) -> Result<Response> {
        self.limiter.admit().await;

        let url = format!("{}{}", GITHUB_API_URL, endpoint);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(Error::Api)?;

        self.update_server_limit(&response);
        self.check_response(response).await
    }

    /// Execute a budget-gated GraphQL query, returning the `data` payload.
    pub async fn post_graphql(&self, query: &str, variables: Value) -> Result<Value> {
        self.limiter.admit().await;

        let response = self
            .http
            .post(GITHUB_GRAPHQL_URL)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(Error::Api)?;

        self.update_server_limit(&response);
        let response = self.check_response(response).await?;
        let body: Value = response.json().await?;

        if let Some(errors) = body.get("errors")
            && errors.as_array().is_some_and(|list| !list.is_empty())
        {
            return Err(Error::GraphQl(errors.to_string()));
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Update server-side rate limit state from response headers.
    fn update_server_limit(&self, response: &Response) {
        let mut server_limit = self.server_limit.lock().unwrap();

        if let Some(limit) = header_value(response, "x-ratelimit-limit") {
            server_limit.limit = limit;
        }
        if let Some(remaining) = header_value(response, "x-ratelimit-remaining") {
            server_limit.remaining = remaining;
        }
        if let Some(reset) = header_value(response, "x-ratelimit-reset") {
            server_limit.reset = reset;
        }
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(response),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => {
                let url = response.url().to_string();
                Err(Error::NotFound(url))
            }
            StatusCode::FORBIDDEN => {
                // 403 with an exhausted quota header is the server's rate limit.
                let server_limit = self.server_rate_limit();
                if server_limit.remaining == 0 {
                    let reset_at = DateTime::from_timestamp(server_limit.reset as i64, 0)
                        .map(|dt| dt.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    Err(Error::RateLimited { reset_at })
                } else {
                    Err(Error::Other(format!(
                        "Forbidden: {}",
                        response.text().await.unwrap_or_default()
                    )))
                }
            }
            status => Err(Error::Other(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }
}

fn header_value(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
