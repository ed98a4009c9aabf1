//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::export::ExportFormat;

/// Top-level CLI parser for `release-audit`.
#[derive(Debug, Parser)]
#[command(
    name = "release-audit",
    version,
    about = "Check that every release issue has a commit behind it"
)]
pub struct Cli {
    /// Answer every service call from a recorded cassette instead of the network.
    #[arg(long, global = true, value_name = "CASSETTE")]
    pub replay: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cross-reference issues matching a JQL query with branch commits.
    Audit(AuditArgs),
    /// Summarize a saved audit result with the language model.
    Summarize {
        /// Audit result JSON written by `audit`.
        result: PathBuf,
        /// What to generate.
        #[arg(long, value_enum, default_value_t = SummaryKind::Missing)]
        kind: SummaryKind,
    },
}

/// Options of the `audit` subcommand.
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Issue query; defaults to `jira.jql_default` from config.yaml.
    #[arg(long)]
    pub jql: Option<String>,
    /// Comma-separated repositories (`slug` or `PROJECT/slug`).
    #[arg(long)]
    pub repos: Option<String>,
    /// Comma-separated branches.
    #[arg(long)]
    pub branches: Option<String>,
    /// Window start (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`); requires --end-date.
    #[arg(long, requires = "end_date")]
    pub start_date: Option<String>,
    /// Window end; requires --start-date.
    #[arg(long, requires = "start_date")]
    pub end_date: Option<String>,
    /// Ignore any cached result and recompute.
    #[arg(long)]
    pub update_cache: bool,
    /// Where to write the result.
    #[arg(long, default_value = "audit_results.json")]
    pub out: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
    /// Also print a language-model summary of the missing issues.
    #[arg(long)]
    pub summarize: bool,
}

/// Kinds of generated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryKind {
    /// Issues without linked commits.
    Missing,
    /// Areas worth regression testing, from commit messages.
    Regression,
    /// Release notes from issue summaries.
    Notes,
}
