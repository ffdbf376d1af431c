// Shared cache backend.
// Talks to an external key-value service over HTTP so several processes can
// share one response cache. Values are JSON text; expiry is handled by the
// service's native TTL.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::Result;

/// Connect timeout for the external store. Kept short so a dead store fails
/// the construction-time probe quickly instead of stalling startup.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Per-request timeout for reads and writes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the external shared key-value store.
///
/// Keys live under `http://{host}:{port}/{namespace}/{key}`; a `GET` on
/// `/ping` answers liveness probes.
#[derive(Debug)]
pub struct SharedStore {
    http: Client,
    base_url: String,
    namespace: String,
}

impl SharedStore {
    pub fn new(host: &str, port: u16, namespace: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
            namespace: namespace.to_string(),
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.namespace, key)
    }

    /// Liveness probe. Run once at manager construction.
    pub async fn ping(&self) -> Result<()> {
        self.http
            .get(format!("{}/ping", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fetch the value for `key`, or `None` if the store has no live entry.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self.http.get(self.key_url(key)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.text().await?))
    }

    /// Store `value` under `key` with the store's native expiry.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.http
            .put(self.key_url(key))
            .query(&[("ttl", ttl.as_secs())])
            .body(value.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Remove `key`. The store treats absent keys as a no-op.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.http
            .delete(self.key_url(key))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_url_includes_namespace() {
        let store = SharedStore::new("cache.internal", 6380, "hubgate").unwrap();

        assert_eq!(
            store.key_url("get_user:octocat"),
            "http://cache.internal:6380/hubgate/get_user:octocat"
        );
    }

    #[tokio::test]
    async fn test_ping_fails_fast_when_unreachable() {
        // Port 1 on loopback: nothing listens there, connect is refused.
        let store = SharedStore::new("127.0.0.1", 1, "hubgate").unwrap();

        assert!(store.ping().await.is_err());
    }
}
