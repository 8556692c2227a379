//! # Commands
//!
//! - `gitpulse analyze <url>` - Clone a repository and report hotspots, churn,
//!   the file tree and code survival curves

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod ui;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use console::style;
pub use gitpulse_core::CONFIG_FILENAME;

use crate::ui::colors;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

fn parse_as_of(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{s}': {e} (expected RFC 3339, e.g. 2024-01-01T00:00:00Z)"))
}

#[derive(Debug, Parser)]
#[command(
    name = "gitpulse",
    version,
    styles = ui::clap_styles(),
    arg_required_else_help = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),
}

#[cfg(feature = "tracing")]
impl Command {
    const fn verbosity(&self) -> u8 {
        match self {
            Self::Analyze(args) => args.verbose,
        }
    }
}

/// Output format for analysis results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Arguments for the `gitpulse analyze` command.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Repository URL or local path to clone.
    pub url: String,

    /// Repository owner (derived from the URL when omitted).
    #[arg(long, requires = "name")]
    pub owner: Option<String>,

    /// Repository name (derived from the URL when omitted).
    #[arg(long, requires = "owner")]
    pub name: Option<String>,

    /// Expected head commit, echoed in the result.
    #[arg(long, value_name = "SHA")]
    pub head: Option<String>,

    /// Overall deadline in seconds, clone included.
    #[arg(short, long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Treat this instant as "now" when sampling survival curves.
    #[arg(long, value_name = "RFC3339", value_parser = parse_as_of)]
    pub as_of: Option<DateTime<Utc>>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to `.gitpulse.toml` configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Glob patterns to exclude from every section.
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Maximum number of concurrent git processes.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Number of hotspots to show in text output.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Increase output verbosity (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

const REPO_URL: &str = "https://github.com/gitpulse/gitpulse";

fn main() {
    let cli = parse_cli();

    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let level = match cli.command.verbosity() {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
            .init();
    }

    if let Err(e) = run(cli.command) {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(ui::exit::ERROR);
    }
}

fn parse_cli() -> Cli {
    let cmd = Cli::command().about(build_about()).after_help(build_after_help());

    let matches = cmd.get_matches();

    #[expect(clippy::expect_used, reason = "clap already validated args; this cannot fail")]
    Cli::from_arg_matches(&matches).expect("failed to parse arguments")
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze(args) => commands::analyze::run(&args),
    }
}

fn build_about() -> String {
    format!(
        r"
  {} turns the commit history of a git repository into analytics.

  Ranks change hotspots, totals churn, maps lines of code onto the
  file tree and measures how much code from each quarter survives.",
        colors::accent().apply_to("gitpulse").bold()
    )
}

fn build_after_help() -> String {
    format!(
        r"
  {}
    gitpulse analyze https://github.com/owner/repo     Analyse a public repository
    gitpulse analyze . --format json                   Analyse a local clone as JSON
    gitpulse analyze <url> -o report.json -f json      Write the report to a file
    gitpulse analyze <url> --timeout 60 -e '*.lock'    Shorter deadline, skip lockfiles
    gitpulse analyze <url> --as-of 2024-06-30T00:00:00Z

  Learn more: {}",
        style("Examples:").bold(),
        colors::accent().apply_to(REPO_URL).underlined()
    )
}
