// GitHub API module.
// The client-facing access layer: all requests pass the shared rate limiter
// and response cache before reaching the network.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{GitHubClient, cache_key};
pub use types::*;
