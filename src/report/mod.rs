pub mod types;

pub use types::Report;

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output the report.
///
/// - `json`: pretty JSON to stdout, or to `output_path` if given
/// - otherwise: coloured terminal output, or markdown to `output_path`
#[instrument(skip(report), fields(title = %report.title()))]
pub fn output(
    report: &Report,
    repo: &str,
    json: bool,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    match (json, output_path) {
        (true, None) => {
            debug!("writing JSON to stdout");
            println!("{}", serde_json::to_string_pretty(report)?);
            Ok(())
        }
        (true, Some(path)) => {
            debug!(path = %path.display(), "writing JSON to file");
            std::fs::write(path, serde_json::to_string_pretty(report)?)?;
            Ok(())
        }
        (false, None) => {
            debug!("writing report to terminal");
            print_terminal_report(report, repo);
            Ok(())
        }
        (false, Some(path)) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, repo, path)
        }
    }
}

/// One display line per item (or per field for single records).
fn item_lines(report: &Report) -> Result<Vec<String>, ReportError> {
    let lines = match report {
        Report::Summary(summary) => vec![
            format!("Name: {}", summary.name),
            format!("Organization: {} (id {})", summary.org.login, summary.org.id),
            format!("Stars: {}", summary.stars),
            format!("Forks: {}", summary.forks),
            format!("Watchers: {}", summary.watchers),
            format!("Open issues: {}", summary.open_issues),
        ],
        Report::PullRequests { pulls, .. } => pulls
            .iter()
            .map(|p| format!("#{} {} ({}, {})", p.number, p.title, p.user.login, p.state))
            .collect(),
        Report::Stargazers(stars) => stars
            .iter()
            .map(|s| format!("{} starred at {}", s.user.login, s.starred_at))
            .collect(),
        Report::Subscribers(users) => users.iter().map(|u| u.login.clone()).collect(),
        Report::Members { logins, .. } => logins.clone(),
        Report::Raw(value) => serde_json::to_string_pretty(value)?
            .lines()
            .map(str::to_string)
            .collect(),
    };
    Ok(lines)
}

fn print_terminal_report(report: &Report, repo: &str) {
    println!();
    println!("{}", repo.bold());
    println!("═══ {} ═══", report.title());
    if let Some(count) = report.count() {
        println!("Total: {}", count.to_string().green().bold());
    }

    match item_lines(report) {
        Ok(lines) if lines.is_empty() => println!("  Nothing found."),
        Ok(lines) if matches!(report, Report::Raw(_)) => {
            for line in lines {
                println!("{line}");
            }
        }
        Ok(lines) => {
            for line in lines {
                println!("  • {line}");
            }
        }
        Err(e) => println!("  {}", format!("could not render: {e}").red()),
    }
    println!();
}

fn write_markdown_report(report: &Report, repo: &str, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# {repo}\n\n"));
    md.push_str(&format!("## {}\n\n", report.title()));
    if let Some(count) = report.count() {
        md.push_str(&format!("**Total: {count}**\n\n"));
    }

    let lines = item_lines(report)?;
    if lines.is_empty() {
        md.push_str("Nothing found.\n");
    } else if let Report::Raw(_) = report {
        md.push_str("```json\n");
        for line in lines {
            md.push_str(&line);
            md.push('\n');
        }
        md.push_str("```\n");
    } else {
        for line in lines {
            md.push_str(&format!("- {line}\n"));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}
