use serde::Serialize;
use serde_json::Value;

use crate::repo::{PullRequest, PullState, RepoSummary, Stargazer, User};

/// One fetched result, ready to render.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Summary(RepoSummary),
    PullRequests {
        state: PullState,
        pulls: Vec<PullRequest>,
    },
    Stargazers(Vec<Stargazer>),
    Subscribers(Vec<User>),
    Members {
        org: String,
        logins: Vec<String>,
    },
    Raw(Value),
}

impl Report {
    /// Section heading used by the terminal and markdown renderers.
    pub fn title(&self) -> String {
        match self {
            Report::Summary(_) => "Repository Summary".to_string(),
            Report::PullRequests { state, .. } => format!("Pull Requests ({state})"),
            Report::Stargazers(_) => "Stargazers".to_string(),
            Report::Subscribers(_) => "Subscribers".to_string(),
            Report::Members { org, .. } => format!("Members of {org}"),
            Report::Raw(_) => "Raw Repository Record".to_string(),
        }
    }

    /// Number of items in a collection report; `None` for single records.
    pub fn count(&self) -> Option<usize> {
        match self {
            Report::Summary(_) | Report::Raw(_) => None,
            Report::PullRequests { pulls, .. } => Some(pulls.len()),
            Report::Stargazers(stars) => Some(stars.len()),
            Report::Subscribers(users) => Some(users.len()),
            Report::Members { logins, .. } => Some(logins.len()),
        }
    }
}
