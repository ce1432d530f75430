//! Client for repository metadata and paginated collections (pull requests,
//! stargazers, subscribers, organization members) on the GitHub REST API.
//!
//! ```rust,ignore
//! use repo_stats::repo::{PullRequestQuery, PullState, Repo, RepoId};
//!
//! let repo = Repo::new(RepoId::parse("GSA/code-gov-front-end")?, token);
//! let summary = repo.basic_info().await?;
//! let closed = repo.pull_requests(PullRequestQuery::with_state(PullState::Closed)).await?;
//! ```

pub mod config;
pub mod repo;
pub mod report;
