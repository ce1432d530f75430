use serde::{Deserialize, Serialize};
use std::fmt;

use super::pagination::Accumulation;

/// Owner/name pair identifying one repository (e.g., "GSA/code-gov-api").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Pull request state filter sent as the `state` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    #[default]
    Open,
    Closed,
    All,
}

impl PullState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
            PullState::All => "all",
        }
    }
}

impl fmt::Display for PullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PullState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(PullState::Open),
            "closed" => Ok(PullState::Closed),
            "all" => Ok(PullState::All),
            other => Err(format!(
                "unknown pull request state: {other} (expected open, closed or all)"
            )),
        }
    }
}

/// Pagination state plus state filter for the pull request fetcher.
#[derive(Debug, Clone, Default)]
pub struct PullRequestQuery {
    pub cursor: Accumulation<PullRequest>,
    pub state: PullState,
}

impl PullRequestQuery {
    pub fn with_state(state: PullState) -> Self {
        Self {
            cursor: Accumulation::default(),
            state,
        }
    }
}

/// Pagination state plus target organization for the members fetcher.
/// `org: None` means the repository owner.
#[derive(Debug, Clone, Default)]
pub struct OrgMembersQuery {
    pub cursor: Accumulation<User>,
    pub org: Option<String>,
}

impl OrgMembersQuery {
    pub fn for_org(org: impl Into<String>) -> Self {
        Self {
            cursor: Accumulation::default(),
            org: Some(org.into()),
        }
    }
}

/// A user or organization account as embedded in API responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub login: String,
    pub id: u64,
}

/// Raw repository record from `GET /repos/{owner}/{name}`, narrowed to the
/// fields the summary needs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepoRecord {
    pub name: String,
    pub organization: Option<User>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    pub open_issues_count: u64,
}

/// Narrowed summary view of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    pub org: User,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
}

/// One entry of `GET /repos/{owner}/{name}/pulls`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: User,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
}

/// One entry of the stargazers listing in the `star+json` media type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stargazer {
    pub starred_at: String,
    pub user: User,
}
