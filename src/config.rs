// Runtime configuration.
// Loads tunables from the environment with sane defaults; only the GitHub
// token is required.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";
/// GitHub GraphQL endpoint.
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Default call budget: GitHub allows 5000 authenticated requests per hour.
pub const DEFAULT_RATE_LIMIT: usize = 5000;
/// Default budget window.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(3600);
/// Default cache TTL when an endpoint does not pick its own.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Access layer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Personal access token used for all API calls.
    pub github_token: String,
    /// Maximum calls admitted within one rate window.
    pub api_rate_limit: usize,
    /// Length of the sliding rate window.
    pub rate_window: Duration,
    /// Fallback TTL for cached responses.
    pub cache_ttl: Duration,
    /// Whether to try the shared cache backend before falling back to the
    /// in-process one.
    pub use_shared_cache: bool,
    /// Shared cache host.
    pub cache_host: String,
    /// Shared cache port.
    pub cache_port: u16,
    /// Key namespace on the shared backend, so several tools can share one
    /// store without colliding.
    pub cache_namespace: String,
}

impl Config {
    /// Build a configuration with defaults for everything but the token.
    pub fn new(github_token: impl Into<String>) -> Self {
        Self {
            github_token: github_token.into(),
            api_rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            cache_ttl: DEFAULT_CACHE_TTL,
            use_shared_cache: false,
            cache_host: "localhost".to_string(),
            cache_port: 6380,
            cache_namespace: "hubgate".to_string(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Recognized variables: `GITHUB_TOKEN` (required), `API_RATE_LIMIT`,
    /// `API_RATE_WINDOW` (seconds), `CACHE_TTL` (seconds), `CACHE_SHARED`,
    /// `CACHE_HOST`, `CACHE_PORT`, `CACHE_NAMESPACE`.
    pub fn from_env() -> Result<Self> {
        let token = env::var("GITHUB_TOKEN").map_err(|_| Error::MissingToken)?;
        let mut config = Self::new(token);

        config.api_rate_limit = env_or("API_RATE_LIMIT", config.api_rate_limit);
        config.rate_window = Duration::from_secs(env_or(
            "API_RATE_WINDOW",
            config.rate_window.as_secs(),
        ));
        config.cache_ttl = Duration::from_secs(env_or("CACHE_TTL", config.cache_ttl.as_secs()));
        config.use_shared_cache = env_or("CACHE_SHARED", config.use_shared_cache);
        if let Ok(host) = env::var("CACHE_HOST") {
            config.cache_host = host;
        }
        config.cache_port = env_or("CACHE_PORT", config.cache_port);
        if let Ok(namespace) = env::var("CACHE_NAMESPACE") {
            config.cache_namespace = namespace;
        }

        Ok(config)
    }
}

/// Parse an environment variable, falling back to `default` when the variable
/// is unset or unparseable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
