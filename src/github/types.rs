// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses; only the
// fields downstream collectors actually read are modeled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
}

/// GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: User,
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Pull request review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub user: Option<User>,
    pub state: String,
    pub body: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Issue or pull request comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub user: Option<User>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Server-side rate limit state, tracked from response headers.
///
/// This reflects what GitHub reports, as opposed to the client-side sliding
/// window the [`RateLimiter`](crate::RateLimiter) enforces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerRateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp at which the server window resets.
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": 1, "login": "octocat"}"#).unwrap();

        assert_eq!(user.login, "octocat");
        assert_eq!(user.name, None);
        assert_eq!(user.followers, 0);
    }

    #[test]
    fn test_repository_round_trips_through_json() {
        let json = r#"{
            "id": 42,
            "name": "spoon-knife",
            "full_name": "octocat/spoon-knife",
            "owner": {"id": 1, "login": "octocat"},
            "private": false,
            "description": null,
            "language": "Rust",
            "stargazers_count": 7,
            "updated_at": "2024-05-01T12:00:00Z",
            "pushed_at": null
        }"#;

        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.full_name, "octocat/spoon-knife");
        assert_eq!(repo.language.as_deref(), Some("Rust"));
        assert!(!repo.fork);

        let back = serde_json::to_string(&repo).unwrap();
        let again: Repository = serde_json::from_str(&back).unwrap();
        assert_eq!(again.id, repo.id);
    }
}
