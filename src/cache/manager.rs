// Cache manager.
// Picks the backend once at construction and hides backend failures from the
// data path: a broken shared store degrades to misses, never to errors.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;
use crate::config::Config;

use super::local::LocalStore;
use super::shared::SharedStore;

/// Which backend a manager ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Shared,
}

#[derive(Debug)]
enum Backend {
    Local(LocalStore),
    Shared(SharedStore),
}

/// TTL response cache routed to one of two backends.
///
/// Backend selection happens exactly once, in [`connect`]: if the shared
/// store is requested but unreachable, the manager silently downgrades to the
/// in-process store for the rest of its life. The downgrade is one-way and
/// never re-probed.
///
/// Caching is advisory. A shared-backend read error is reported as a miss and
/// a write error is swallowed, so the primary data path can never be failed
/// by the cache.
///
/// [`connect`]: CacheManager::connect
#[derive(Debug)]
pub struct CacheManager {
    backend: Backend,
    default_ttl: Duration,
}

impl CacheManager {
    /// Build a manager over the in-process store.
    pub fn local(default_ttl: Duration) -> Self {
        Self {
            backend: Backend::Local(LocalStore::new()),
            default_ttl,
        }
    }

    /// In-process manager with an injected clock (tests).
    pub fn local_with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: Backend::Local(LocalStore::with_clock(clock)),
            default_ttl,
        }
    }

    /// Build a manager from configuration, probing the shared store when one
    /// is requested.
    pub async fn connect(config: &Config) -> Self {
        if !config.use_shared_cache {
            return Self::local(config.cache_ttl);
        }

        let shared = match SharedStore::new(
            &config.cache_host,
            config.cache_port,
            &config.cache_namespace,
        ) {
            Ok(store) => store,
            Err(err) => {
                warn!("shared cache client setup failed, using local store: {err}");
                return Self::local(config.cache_ttl);
            }
        };

        match shared.ping().await {
            Ok(()) => Self {
                backend: Backend::Shared(shared),
                default_ttl: config.cache_ttl,
            },
            Err(err) => {
                warn!(
                    "shared cache at {}:{} unreachable, using local store: {err}",
                    config.cache_host, config.cache_port
                );
                Self::local(config.cache_ttl)
            }
        }
    }

    /// The backend this manager settled on.
    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::Local(_) => BackendKind::Local,
            Backend::Shared(_) => BackendKind::Shared,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up `key`. Shared-backend failures degrade to a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match &self.backend {
            Backend::Local(store) => store.get(key),
            Backend::Shared(store) => match store.get(key).await {
                Ok(value) => value,
                Err(err) => {
                    debug!("shared cache read for {key:?} failed, treating as miss: {err}");
                    None
                }
            },
        }
    }

    /// Store `value` under `key`. `ttl` of `None` uses the manager default.
    /// Shared-backend failures are logged and swallowed.
    pub async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        match &self.backend {
            Backend::Local(store) => store.set(key, value, ttl),
            Backend::Shared(store) => {
                if let Err(err) = store.set(key, &value, ttl).await {
                    warn!("shared cache write for {key:?} failed: {err}");
                }
            }
        }
    }

    /// Remove `key`. Absent keys and shared-backend failures are no-ops.
    pub async fn delete(&self, key: &str) {
        match &self.backend {
            Backend::Local(store) => store.delete(key),
            Backend::Shared(store) => {
                if let Err(err) = store.delete(key).await {
                    warn!("shared cache delete for {key:?} failed: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn shared_config() -> Config {
        let mut config = Config::new("ghp_test");
        config.use_shared_cache = true;
        config.cache_host = "127.0.0.1".to_string();
        // Nothing listens here; the probe must fail and fall back.
        config.cache_port = 1;
        config
    }

    #[tokio::test]
    async fn test_local_round_trip_with_default_ttl() {
        let manager = CacheManager::local(Duration::from_secs(60));

        manager.set("k", "v".to_string(), None).await;

        assert_eq!(manager.get("k").await, Some("v".to_string()));
        assert_eq!(manager.backend(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_explicit_ttl_beats_default() {
        let clock = Arc::new(ManualClock::new());
        let manager = CacheManager::local_with_clock(Duration::from_secs(3600), clock.clone());

        manager
            .set("k", "v".to_string(), Some(Duration::from_secs(5)))
            .await;
        clock.advance(Duration::from_secs(6));

        assert_eq!(manager.get("k").await, None);
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let manager = CacheManager::local(Duration::from_secs(60));
        manager.set("k", "v".to_string(), None).await;

        manager.delete("k").await;

        assert_eq!(manager.get("k").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_shared_store_falls_back_to_local() {
        let manager = CacheManager::connect(&shared_config()).await;

        assert_eq!(manager.backend(), BackendKind::Local);

        // And the fallback manager behaves exactly like a local one.
        manager.set("k", "v".to_string(), None).await;
        assert_eq!(manager.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_local_config_skips_probe_entirely() {
        let mut config = shared_config();
        config.use_shared_cache = false;

        let manager = CacheManager::connect(&config).await;

        assert_eq!(manager.backend(), BackendKind::Local);
        assert_eq!(manager.default_ttl(), config.cache_ttl);
    }
}
