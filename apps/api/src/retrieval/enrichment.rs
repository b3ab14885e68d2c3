//! External profile enrichment: live GitHub data and a LinkedIn pointer,
//! derived from the owner's stored social links.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::context::{
    ExternalProfiles, GithubProfile, GithubRepo, GithubSnapshot, LinkedinNote,
};
use crate::models::resume::SocialLink;

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "folio-rag-bot";
const RECENT_REPO_LIMIT: usize = 10;
const PINNED_REPO_LIMIT: usize = 6;
/// Repos carried into the context and listed in the summary.
const DISPLAY_REPO_LIMIT: usize = 5;
/// All GitHub calls for one query share this budget.
pub const ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(5);

static GITHUB_USER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/?#]+)").unwrap());

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned status {0}")]
    Status(u16),

    #[error("enrichment timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait ProfileEnricher: Send + Sync {
    /// `Ok(None)` when no link points at a supported platform.
    async fn enrich(&self, links: &[SocialLink])
        -> Result<Option<ExternalProfiles>, EnrichmentError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Link inspection (pure)
// ────────────────────────────────────────────────────────────────────────────

pub fn github_username(links: &[SocialLink]) -> Option<String> {
    links
        .iter()
        .find(|l| l.platform.eq_ignore_ascii_case("github") || l.url.contains("github.com"))
        .and_then(|l| GITHUB_USER_RE.captures(&l.url))
        .map(|c| c[1].to_string())
}

pub fn linkedin_note(links: &[SocialLink]) -> Option<LinkedinNote> {
    links
        .iter()
        .find(|l| l.platform.eq_ignore_ascii_case("linkedin") || l.url.contains("linkedin.com"))
        .map(|l| LinkedinNote {
            available: true,
            message: format!("Please visit the LinkedIn profile directly: {}", l.url),
        })
}

/// Natural-language digest of the GitHub data for the prompt. Empty without a profile.
pub fn summarize_github(
    profile: Option<&GithubProfile>,
    repos: &[GithubRepo],
    pinned: &[GithubRepo],
) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    let mut lines = vec![format!(
        "GitHub profile: {}",
        profile.name.as_deref().unwrap_or(&profile.login)
    )];
    if let Some(bio) = &profile.bio {
        lines.push(format!("Bio: {bio}"));
    }
    if let Some(company) = &profile.company {
        lines.push(format!("Company: {company}"));
    }
    if let Some(location) = &profile.location {
        lines.push(format!("Location: {location}"));
    }
    lines.push(format!("Public repositories: {}", profile.public_repos));
    lines.push(format!("Followers: {}", profile.followers));

    let shown = if pinned.is_empty() {
        &repos[..repos.len().min(DISPLAY_REPO_LIMIT)]
    } else {
        pinned
    };
    if !shown.is_empty() {
        lines.push("\nHighlighted repositories:".to_string());
        for repo in shown {
            let lang = repo
                .language
                .as_ref()
                .map(|l| format!(" [{l}]"))
                .unwrap_or_default();
            let stars = if repo.stargazers_count > 0 {
                format!(" ⭐{}", repo.stargazers_count)
            } else {
                String::new()
            };
            let description = repo.description.as_deref().unwrap_or("no description");
            lines.push(format!("- {}{lang}{stars}: {description}", repo.name));
        }
    }

    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// GithubEnricher: REST for profile and repos, GraphQL for pinned items
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GithubEnricher {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl GithubEnricher {
    pub fn new(client: Client, token: Option<String>) -> Self {
        Self {
            client,
            token,
            base_url: GITHUB_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_profile(&self, username: &str) -> Result<GithubProfile, EnrichmentError> {
        let response = self
            .client
            .get(format!("{}/users/{username}", self.base_url))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn fetch_repos(&self, username: &str) -> Result<Vec<GithubRepo>, EnrichmentError> {
        let response = self
            .client
            .get(format!("{}/users/{username}/repos", self.base_url))
            .query(&[
                ("sort", "updated".to_string()),
                ("per_page", RECENT_REPO_LIMIT.to_string()),
            ])
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    /// Pinned repositories need an authenticated GraphQL call; without a token there are none.
    async fn fetch_pinned(&self, username: &str) -> Result<Vec<GithubRepo>, EnrichmentError> {
        let Some(token) = &self.token else {
            return Ok(Vec::new());
        };

        let query = r#"
            query($login: String!, $first: Int!) {
              user(login: $login) {
                pinnedItems(first: $first, types: REPOSITORY) {
                  nodes {
                    ... on Repository {
                      name
                      description
                      url
                      primaryLanguage { name }
                      stargazerCount
                      forkCount
                      repositoryTopics(first: 5) { nodes { topic { name } } }
                    }
                  }
                }
              }
            }
        "#;

        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .bearer_auth(token)
            .header("User-Agent", USER_AGENT)
            .json(&json!({
                "query": query,
                "variables": { "login": username, "first": PINNED_REPO_LIMIT },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }

        let body: PinnedResponse = response.json().await?;
        Ok(body
            .data
            .and_then(|d| d.user)
            .map(|u| u.pinned_items.nodes.into_iter().map(GithubRepo::from).collect())
            .unwrap_or_default())
    }

    async fn github_snapshot(&self, username: &str) -> GithubSnapshot {
        let (profile, repos, pinned) = tokio::join!(
            self.fetch_profile(username),
            self.fetch_repos(username),
            self.fetch_pinned(username),
        );

        let profile = profile
            .map_err(|e| warn!("GitHub profile fetch for {username} failed: {e}"))
            .ok();
        let mut repos = repos
            .map_err(|e| warn!("GitHub repos fetch for {username} failed: {e}"))
            .unwrap_or_default();
        let pinned_repos = pinned
            .map_err(|e| warn!("GitHub pinned repos fetch for {username} failed: {e}"))
            .unwrap_or_default();

        let summary = summarize_github(profile.as_ref(), &repos, &pinned_repos);
        repos.truncate(DISPLAY_REPO_LIMIT);

        GithubSnapshot {
            profile,
            repos,
            pinned_repos,
            summary,
        }
    }
}

#[async_trait]
impl ProfileEnricher for GithubEnricher {
    async fn enrich(
        &self,
        links: &[SocialLink],
    ) -> Result<Option<ExternalProfiles>, EnrichmentError> {
        let linkedin = linkedin_note(links);
        let github = match github_username(links) {
            Some(username) => {
                debug!("Enriching with GitHub data for {username}");
                let snapshot = tokio::time::timeout(ENRICHMENT_TIMEOUT, self.github_snapshot(&username))
                    .await
                    .map_err(|_| EnrichmentError::Timeout(ENRICHMENT_TIMEOUT))?;
                Some(snapshot)
            }
            None => None,
        };

        if github.is_none() && linkedin.is_none() {
            return Ok(None);
        }
        Ok(Some(ExternalProfiles { github, linkedin }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GraphQL response shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PinnedResponse {
    data: Option<PinnedData>,
}

#[derive(Debug, Deserialize)]
struct PinnedData {
    user: Option<PinnedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinnedUser {
    pinned_items: PinnedNodes,
}

#[derive(Debug, Deserialize)]
struct PinnedNodes {
    nodes: Vec<PinnedRepo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinnedRepo {
    name: String,
    description: Option<String>,
    url: String,
    primary_language: Option<NamedNode>,
    #[serde(default)]
    stargazer_count: u32,
    #[serde(default)]
    fork_count: u32,
    repository_topics: Option<TopicNodes>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopicNodes {
    nodes: Vec<TopicNode>,
}

#[derive(Debug, Deserialize)]
struct TopicNode {
    topic: NamedNode,
}

impl From<PinnedRepo> for GithubRepo {
    fn from(repo: PinnedRepo) -> Self {
        GithubRepo {
            name: repo.name,
            description: repo.description,
            html_url: repo.url,
            language: repo.primary_language.map(|l| l.name),
            stargazers_count: repo.stargazer_count,
            forks_count: repo.fork_count,
            topics: repo
                .repository_topics
                .map(|t| t.nodes.into_iter().map(|n| n.topic.name).collect())
                .unwrap_or_default(),
        }
    }
}
