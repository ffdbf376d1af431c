// GitHub API endpoint functions.
// Typed, cached methods over the raw transport; per-endpoint TTLs follow how
// quickly each kind of data goes stale.

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::Result;

use super::client::{GitHubClient, cache_key};
use super::types::{IssueComment, Repository, Review, User};

/// Profiles and repository metadata drift slowly.
const PROFILE_TTL: Duration = Duration::from_secs(1800);
/// Event feeds churn, so they get half the profile TTL.
const EVENTS_TTL: Duration = Duration::from_secs(900);

/// Page size for list endpoints.
const PER_PAGE: u32 = 100;
/// Event feed fetches stop after this many pages.
const EVENTS_MAX_PAGES: u32 = 3;

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    login
    name
    avatarUrl
    bio
    location
    company
    contributionsCollection {
      totalCommitContributions
      totalIssueContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      contributionCalendar {
        totalContributions
      }
    }
    repositories(first: 100, ownerAffiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER]) {
      nodes {
        name
        nameWithOwner
        description
        stargazerCount
        forkCount
        primaryLanguage {
          name
        }
      }
    }
  }
}
"#;

impl GitHubClient {
    /// Get a user's profile.
    pub async fn get_user(&self, username: &str) -> Result<User> {
        let key = cache_key("get_user", &[username]);
        self.fetch_cached(&key, PROFILE_TTL, || async move {
            let response = self.get(&format!("/users/{}", username)).await?;
            Ok(response.json().await?)
        })
        .await
    }

    /// Get all of a user's repositories, following pagination to the end.
    pub async fn get_user_repos(&self, username: &str) -> Result<Vec<Repository>> {
        let key = cache_key("get_user_repos", &[username]);
        self.fetch_cached(&key, PROFILE_TTL, || async move {
            let mut repos = Vec::new();
            let mut page = 1u32;
            loop {
                let params = [("page", page.to_string()), ("per_page", PER_PAGE.to_string())];
                let response = self
                    .get_with_params(&format!("/users/{}/repos", username), &params)
                    .await?;
                let batch: Vec<Repository> = response.json().await?;
                if batch.is_empty() {
                    break;
                }
                repos.extend(batch);
                page += 1;
            }
            Ok(repos)
        })
        .await
    }

    /// Get a user's recent public events, capped at a few pages.
    pub async fn get_user_events(&self, username: &str) -> Result<Vec<Value>> {
        let key = cache_key("get_user_events", &[username]);
        self.fetch_cached(&key, EVENTS_TTL, || async move {
            let mut events = Vec::new();
            let mut page = 1u32;
            while page <= EVENTS_MAX_PAGES {
                let params = [("page", page.to_string()), ("per_page", PER_PAGE.to_string())];
                let response = self
                    .get_with_params(&format!("/users/{}/events", username), &params)
                    .await?;
                let batch: Vec<Value> = response.json().await?;
                if batch.is_empty() {
                    break;
                }
                events.extend(batch);
                page += 1;
            }
            Ok(events)
        })
        .await
    }

    /// Get a repository's metadata.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let key = cache_key("get_repo", &[owner, repo]);
        self.fetch_cached(&key, PROFILE_TTL, || async move {
            let response = self.get(&format!("/repos/{}/{}", owner, repo)).await?;
            Ok(response.json().await?)
        })
        .await
    }

    /// Get reviews on a pull request. Uncached: review state changes drive
    /// staleness decisions and must be current.
    pub async fn get_pull_request_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>> {
        let response = self
            .get(&format!(
                "/repos/{}/{}/pulls/{}/reviews",
                owner, repo, pr_number
            ))
            .await?;
        let reviews: Vec<Review> = response.json().await?;
        Ok(reviews)
    }

    /// Get comments on an issue. Uncached for the same reason as reviews.
    pub async fn get_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
    ) -> Result<Vec<IssueComment>> {
        let response = self
            .get(&format!(
                "/repos/{}/{}/issues/{}/comments",
                owner, repo, issue_number
            ))
            .await?;
        let comments: Vec<IssueComment> = response.json().await?;
        Ok(comments)
    }

    /// Get a user's contribution stats via GraphQL.
    pub async fn get_user_contributions(&self, username: &str) -> Result<Value> {
        self.post_graphql(CONTRIBUTIONS_QUERY, json!({ "login": username }))
            .await
    }
}
