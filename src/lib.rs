// hubgate: rate-limited caching access layer for the GitHub API.
//
// Every API call funnels through one shared RateLimiter (sliding-window call
// budget) and one shared CacheManager (TTL response cache, local or shared
// backend) before touching the network. Collectors consume the layer through
// GitHubClient and its fetch_cached contract instead of issuing raw requests.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod limiter;

pub use cache::{BackendKind, CacheManager};
pub use config::Config;
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use limiter::{RateBudget, RateLimiter};
