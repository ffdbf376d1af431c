// Error types for the hubgate access layer.
// Handles GitHub API errors, cache backend errors, and configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
