use clap::{Parser, Subcommand};
use repo_stats::config::Config;
use repo_stats::repo::{
    Accumulation, HttpExecutor, OrgMembersQuery, PullRequestQuery, PullState, Repo, RepoError,
    RepoId,
};
use repo_stats::report::{self, Report};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// Repo Stats — collects repository metadata and paginated collections
/// (pull requests, stargazers, subscribers, organization members) from GitHub.
#[derive(Parser, Debug)]
#[command(name = "repo-stats", version, about)]
struct Cli {
    /// Repository identifier (e.g., GSA/code-gov-front-end)
    repo: String,

    /// Print JSON instead of the formatted report
    #[arg(long)]
    json: bool,

    /// Optional output file path (markdown, or JSON with --json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Name, organization, and star/fork/watcher/open-issue counts
    Info,
    /// The unmodified repository record
    Raw,
    /// All pull requests in the given state
    Pulls {
        /// open, closed, or all
        #[arg(long)]
        state: Option<PullState>,
    },
    /// All stargazers with their star timestamps
    Stars,
    /// All accounts watching the repository
    Subscribers,
    /// Logins of every member of an organization
    Members {
        /// Organization (defaults to the repository owner)
        #[arg(long)]
        org: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("repo_stats", repo = %cli.repo).entered();

    let id = RepoId::parse(&cli.repo)?;
    debug!(owner = %id.owner, name = %id.name, "parsed repository identifier");

    info!("loading configuration");
    let config = Config::load()?;
    let token = config.github_token().ok_or(RepoError::MissingToken)?;

    let mut executor = HttpExecutor::new(token);
    if let Some(user_agent) = &config.github.user_agent {
        executor = executor.with_user_agent(user_agent);
    }
    let mut handle = Repo::with_source(id, Box::new(executor));
    if let Some(api_url) = &config.github.api_url {
        handle = handle.with_base_url(api_url)?;
    }

    info!(command = ?cli.command, "fetching from GitHub");
    let built_report = run(&handle, cli.command, &config).await?;
    if let Some(count) = built_report.count() {
        info!(items = count, "fetch complete");
    }

    report::output(&built_report, &handle.full_name(), cli.json, cli.output.as_deref())?;
    info!("done");

    Ok(())
}

async fn run(handle: &Repo, command: Command, config: &Config) -> Result<Report, RepoError> {
    let report = match command {
        Command::Info => Report::Summary(handle.basic_info().await?),
        Command::Raw => Report::Raw(handle.raw().await?),
        Command::Pulls { state } => {
            let state = state.or(config.defaults.state).unwrap_or_default();
            let pulls = handle
                .pull_requests(PullRequestQuery::with_state(state))
                .await?;
            Report::PullRequests { state, pulls }
        }
        Command::Stars => Report::Stargazers(handle.stargazers(Accumulation::default()).await?),
        Command::Subscribers => {
            Report::Subscribers(handle.subscribers(Accumulation::default()).await?)
        }
        Command::Members { org } => {
            let org = org
                .or_else(|| config.defaults.org.clone())
                .unwrap_or_else(|| handle.id().owner.clone());
            let logins = handle
                .org_members(OrgMembersQuery::for_org(org.clone()))
                .await?;
            Report::Members { org, logins }
        }
    };
    Ok(report)
}
