pub mod pagination;
pub mod request;
pub mod types;

pub use pagination::Accumulation;
pub use request::{HttpExecutor, Page, PageRequest, PageSource};
pub use types::{
    OrgMembersQuery, PullRequest, PullRequestQuery, PullState, RepoId, RepoSummary, Stargazer,
    User,
};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use types::RepoRecord;

pub const DEFAULT_API_URL: &str = "https://api.github.com/";

const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";
const SUBSCRIBER_MEDIA_TYPE: &str = "application/vnd.github.v1+json";
const MEMBER_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Response body is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    Schema(String),

    #[error("Invalid repository identifier: {0} (expected owner/name)")]
    InvalidRepo(String),

    #[error("Invalid organization name: {0}")]
    InvalidOrg(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

impl RepoId {
    /// Parse an `owner/name` identifier.
    pub fn parse(value: &str) -> Result<RepoId, RepoError> {
        let invalid = || RepoError::InvalidRepo(value.to_string());
        let (owner, name) = value.trim().split_once('/').ok_or_else(invalid)?;
        if !is_valid_name(owner) || !is_valid_name(name) {
            return Err(invalid());
        }
        Ok(RepoId {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// GitHub account and repository names: ASCII letters, digits, `.`, `_`
/// and `-`, never `.` or `..` on their own.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Build an endpoint URL under `base` from path segments and query
/// parameters. Each segment is percent-encoded as a single path segment.
pub fn endpoint(
    base: &str,
    segments: &[&str],
    query: &[(&str, String)],
) -> Result<Url, RepoError> {
    let invalid = || RepoError::InvalidUrl(format!("{base}{}", segments.join("/")));
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err(invalid());
    }
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
}

fn accept(media_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(media_type));
    headers
}

/// Handle for one repository, holding the credentialed page source used
/// for all of its requests.
pub struct Repo {
    id: RepoId,
    base_url: String,
    source: Box<dyn PageSource>,
}

impl Repo {
    pub fn new(id: RepoId, token: impl Into<String>) -> Self {
        Self::with_source(id, Box::new(HttpExecutor::new(token)))
    }

    pub fn with_source(id: RepoId, source: Box<dyn PageSource>) -> Self {
        Self {
            id,
            base_url: DEFAULT_API_URL.to_string(),
            source,
        }
    }

    /// Point the handle at another API host (GitHub Enterprise, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, RepoError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Url::parse(&normalized).map_err(|_| RepoError::InvalidUrl(base_url.to_string()))?;
        self.base_url = normalized;
        Ok(self)
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn full_name(&self) -> String {
        self.id.to_string()
    }

    fn repo_path<'a>(&'a self, sub: Option<&'a str>) -> Vec<&'a str> {
        let mut segments = vec!["repos", self.id.owner.as_str(), self.id.name.as_str()];
        segments.extend(sub);
        segments
    }

    async fn fetch_single(&self) -> Result<Page, RepoError> {
        let request = PageRequest {
            url: endpoint(&self.base_url, &self.repo_path(None), &[])?,
            headers: HeaderMap::new(),
            page: 1,
        };
        self.source.fetch(&request).await
    }

    /// The unmodified repository record.
    #[instrument(skip(self), fields(repo = %self.id))]
    pub async fn raw(&self) -> Result<Value, RepoError> {
        Ok(self.fetch_single().await?.body)
    }

    /// Narrowed summary of the repository. Repositories without an owning
    /// organization are rejected with `RepoError::Schema`.
    #[instrument(skip(self), fields(repo = %self.id))]
    pub async fn basic_info(&self) -> Result<RepoSummary, RepoError> {
        let record: RepoRecord = self.fetch_single().await?.record()?;
        let org = record.organization.ok_or_else(|| {
            RepoError::Schema(format!("repository {} has no organization", self.id))
        })?;
        debug!(
            org = %org.login,
            stars = record.stargazers_count,
            "received repository record"
        );

        Ok(RepoSummary {
            name: record.name,
            org,
            stars: record.stargazers_count,
            forks: record.forks_count,
            watchers: record.watchers_count,
            open_issues: record.open_issues_count,
        })
    }

    /// All pull requests matching `query.state`.
    #[instrument(
        skip(self, query),
        fields(repo = %self.id, state = %query.state, page = query.cursor.page)
    )]
    pub async fn pull_requests(
        &self,
        query: PullRequestQuery,
    ) -> Result<Vec<PullRequest>, RepoError> {
        let path = self.repo_path(Some("pulls"));
        let state = query.state.as_str().to_string();
        pagination::accumulate(
            self.source.as_ref(),
            |page| {
                endpoint(
                    &self.base_url,
                    &path,
                    &[("page", page.to_string()), ("state", state.clone())],
                )
            },
            &HeaderMap::new(),
            query.cursor,
        )
        .await
    }

    /// All stargazers with the time they starred the repository.
    #[instrument(skip(self, cursor), fields(repo = %self.id, page = cursor.page))]
    pub async fn stargazers(
        &self,
        cursor: Accumulation<Stargazer>,
    ) -> Result<Vec<Stargazer>, RepoError> {
        self.paged("stargazers", STAR_MEDIA_TYPE, cursor).await
    }

    /// All accounts watching the repository.
    #[instrument(skip(self, cursor), fields(repo = %self.id, page = cursor.page))]
    pub async fn subscribers(&self, cursor: Accumulation<User>) -> Result<Vec<User>, RepoError> {
        self.paged("subscribers", SUBSCRIBER_MEDIA_TYPE, cursor).await
    }

    /// Logins of every member of `query.org` (the repository owner by default).
    #[instrument(skip(self, query), fields(repo = %self.id, page = query.cursor.page))]
    pub async fn org_members(&self, query: OrgMembersQuery) -> Result<Vec<String>, RepoError> {
        let org = query.org.unwrap_or_else(|| self.id.owner.clone());
        if !is_valid_name(&org) {
            return Err(RepoError::InvalidOrg(org));
        }
        let path = ["orgs", org.as_str(), "members"];
        let members: Vec<User> = pagination::accumulate(
            self.source.as_ref(),
            |page| endpoint(&self.base_url, &path, &[("page", page.to_string())]),
            &accept(MEMBER_MEDIA_TYPE),
            query.cursor,
        )
        .await?;
        debug!(org = %org, members = members.len(), "collected organization members");
        Ok(members.into_iter().map(|m| m.login).collect())
    }

    async fn paged<T>(
        &self,
        sub: &str,
        media_type: &'static str,
        cursor: Accumulation<T>,
    ) -> Result<Vec<T>, RepoError>
    where
        T: serde::de::DeserializeOwned,
    {
        let path = self.repo_path(Some(sub));
        pagination::accumulate(
            self.source.as_ref(),
            |page| endpoint(&self.base_url, &path, &[("page", page.to_string())]),
            &accept(media_type),
            cursor,
        )
        .await
    }
}
