//! # repopulse
//!
//! Measure repository size and code churn, and publish them as time-series metrics.
//!
//! ## Overview
//!
//! repopulse is built on top of repopulselib. It counts code, comment and blank
//! lines for Java, Python, Go and JavaScript sources, measures line churn over
//! the first-parent git history, and runs whole-repository analyses on a
//! bounded worker pool that writes its observations to InfluxDB.
//!
//! ## Usage
//!
//! ```bash
//! # Count LOC in current directory
//! repopulse .
//!
//! # Breakdown by package or by file, as JSON
//! repopulse loc . --by-package --output json
//!
//! # Churn of the last 30 days
//! repopulse churn . --days 30
//!
//! # Analyze repositories on the worker pool and write to InfluxDB
//! INFLUX_TOKEN=... repopulse analyze \
//!     --repo-url https://github.com/owner/repo --path ../other --workers 4
//!
//! # Same, without writing anywhere
//! repopulse analyze --path . --dry-run
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Days, NaiveDate, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use repopulselib::config::{
    DEFAULT_CHURN_WINDOW_DAYS, DEFAULT_CLONE_TIMEOUT_SECS, DEFAULT_POOL_SIZE,
    DEFAULT_QUEUE_CAPACITY,
};
use repopulselib::data::{commit_history, open_repository};
use repopulselib::{
    analyze_churn, count_directory, Aggregation, AnalysisOptions, ChurnReport, CountOptions,
    DateRange, FilterConfig, GitMaterializer, InfluxConfig, InfluxSink, Job, JobRequest, JobSource,
    JobStatus, LocTable, MemorySink, MetricsSink, PoolConfig, PoolState, WorkerPool,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn from_matches(matches: &ArgMatches) -> Self {
        match matches.get_one::<String>("output").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_parser(["table", "json"])
        .default_value("table")
        .help("Output format")
}

fn range_args() -> [Arg; 3] {
    [
        Arg::new("since")
            .long("since")
            .value_name("YYYY-MM-DD")
            .help("First day of the churn window"),
        Arg::new("until")
            .long("until")
            .value_name("YYYY-MM-DD")
            .help("Last day of the churn window (defaults to today)"),
        Arg::new("days")
            .long("days")
            .env("REPOPULSE_CHURN_WINDOW_DAYS")
            .value_parser(value_parser!(u32).range(1..))
            .help("Window length in days when --since is not given [default: 7]"),
    ]
}

fn loc_args() -> [Arg; 6] {
    [
        Arg::new("path")
            .help("Path to analyze (defaults to current directory)")
            .default_value("."),
        Arg::new("include")
            .short('i')
            .long("include")
            .action(ArgAction::Append)
            .help("Include files matching glob pattern"),
        Arg::new("exclude")
            .short('e')
            .long("exclude")
            .action(ArgAction::Append)
            .help("Exclude files matching glob pattern"),
        Arg::new("by-package")
            .short('p')
            .long("by-package")
            .action(ArgAction::SetTrue)
            .conflicts_with("by-file")
            .help("Show breakdown by package (directory)"),
        Arg::new("by-file")
            .short('f')
            .long("by-file")
            .action(ArgAction::SetTrue)
            .help("Show breakdown by file"),
        output_arg(),
    ]
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("repopulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Repository size and churn metrics with a bounded analysis worker pool")
        .args(loc_args())
        .subcommand(
            Command::new("loc")
                .about("Count lines of code (default command)")
                .args(loc_args()),
        )
        .subcommand(
            Command::new("churn")
                .about("Show lines added, deleted and modified over a date range")
                .arg(
                    Arg::new("path")
                        .help("Path to a git repository")
                        .default_value("."),
                )
                .args(range_args())
                .arg(
                    Arg::new("by-commit")
                        .short('c')
                        .long("by-commit")
                        .action(ArgAction::SetTrue)
                        .help("One row per commit instead of per day"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("analyze")
                .about("Analyze repositories on the worker pool and write metrics")
                .arg(
                    Arg::new("repo-url")
                        .short('r')
                        .long("repo-url")
                        .action(ArgAction::Append)
                        .help("GitHub repository to clone and analyze (repeatable)"),
                )
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .action(ArgAction::Append)
                        .help("Local directory to analyze (repeatable)"),
                )
                .args(range_args())
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .env("REPOPULSE_POOL_SIZE")
                        .value_parser(value_parser!(usize))
                        .help("Number of worker threads [default: 4]"),
                )
                .arg(
                    Arg::new("queue-capacity")
                        .long("queue-capacity")
                        .env("REPOPULSE_QUEUE_CAPACITY")
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of jobs waiting for a worker [default: 64]"),
                )
                .arg(
                    Arg::new("clone-timeout")
                        .long("clone-timeout")
                        .env("REPOPULSE_CLONE_TIMEOUT_SECS")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("Seconds a repository clone may take [default: 120]"),
                )
                .arg(
                    Arg::new("influx-url")
                        .long("influx-url")
                        .env("INFLUX_URL")
                        .default_value("http://localhost:8086")
                        .help("InfluxDB base url"),
                )
                .arg(
                    Arg::new("influx-token")
                        .long("influx-token")
                        .env("INFLUX_TOKEN")
                        .hide_env_values(true)
                        .help("InfluxDB API token"),
                )
                .arg(
                    Arg::new("influx-org")
                        .long("influx-org")
                        .env("INFLUX_ORG")
                        .default_value("repopulse")
                        .help("InfluxDB organization"),
                )
                .arg(
                    Arg::new("influx-bucket")
                        .long("influx-bucket")
                        .env("INFLUX_BUCKET")
                        .default_value("repo_metrics")
                        .help("InfluxDB bucket"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Keep records in memory instead of writing them"),
                )
                .arg(output_arg()),
        )
}

/// Build filter config from matches
fn build_filter(matches: &ArgMatches) -> Result<FilterConfig, anyhow::Error> {
    let mut filter = FilterConfig::new();

    if let Some(includes) = matches.get_many::<String>("include") {
        for pattern in includes {
            filter = filter.include(pattern)?;
        }
    }

    if let Some(excludes) = matches.get_many::<String>("exclude") {
        for pattern in excludes {
            filter = filter.exclude(pattern)?;
        }
    }

    Ok(filter)
}

fn parse_day(flag: &str, value: &str) -> Result<NaiveDate, anyhow::Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid --{flag} date '{value}', expected YYYY-MM-DD"))
}

/// Churn window from `--since`, `--until` and `--days`.
///
/// Returns `None` when no flag was given explicitly, so the pool applies its
/// own trailing window per job.
fn explicit_range(matches: &ArgMatches) -> Result<Option<DateRange>, anyhow::Error> {
    let since = matches.get_one::<String>("since");
    let until = matches.get_one::<String>("until");
    let days = matches.get_one::<u32>("days").copied();

    if since.is_none() && until.is_none() && days.is_none() {
        return Ok(None);
    }
    let days = days.unwrap_or(DEFAULT_CHURN_WINDOW_DAYS);

    let end = match until {
        Some(value) => parse_day("until", value)?,
        None => Utc::now().date_naive(),
    };
    let range = match since {
        Some(value) => DateRange::new(parse_day("since", value)?, end)?,
        None => {
            let start = end
                .checked_sub_days(Days::new(u64::from(days - 1)))
                .unwrap_or(end);
            DateRange::new(start, end)?
        }
    };
    Ok(Some(range))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn loc_handler(matches: &ArgMatches) -> Result<ExitCode, anyhow::Error> {
    let path = matches
        .get_one::<String>("path")
        .map(String::as_str)
        .unwrap_or(".");
    let filter = build_filter(matches)?;
    let result = count_directory(path, &CountOptions::new().filter(filter))?;

    let aggregation = if matches.get_flag("by-file") {
        Aggregation::ByFile
    } else if matches.get_flag("by-package") {
        Aggregation::ByPackage
    } else {
        Aggregation::Total
    };
    let table = LocTable::from_count(&result, aggregation);

    match OutputFormat::from_matches(matches) {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Table => print!("{}", render::render_table(&table)),
    }
    Ok(ExitCode::SUCCESS)
}

fn churn_handler(matches: &ArgMatches) -> Result<ExitCode, anyhow::Error> {
    let path = PathBuf::from(
        matches
            .get_one::<String>("path")
            .map(String::as_str)
            .unwrap_or("."),
    );
    if !path.is_dir() {
        bail!("path does not exist: {}", path.display());
    }

    let range = explicit_range(matches)?
        .unwrap_or_else(|| DateRange::trailing_from_now(DEFAULT_CHURN_WINDOW_DAYS));

    let report = match open_repository(&path)? {
        Some(repo) => {
            let history = commit_history(&repo, &range)?;
            analyze_churn(&history, range)
        }
        None => {
            tracing::warn!(path = %path.display(), "not a git repository, churn is empty");
            ChurnReport::empty(range)
        }
    };

    match OutputFormat::from_matches(matches) {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            let table = LocTable::from_churn(&report, matches.get_flag("by-commit"));
            print!("{}", render::render_table(&table));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Local paths become absolute so jobs do not depend on the working directory.
fn absolute_path(raw: &str) -> Result<String, anyhow::Error> {
    let path = Path::new(raw.trim());
    let absolute = if path.exists() {
        path.canonicalize()
            .with_context(|| format!("cannot resolve path '{raw}'"))?
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(absolute.to_string_lossy().into_owned())
}

fn collect_sources(matches: &ArgMatches) -> Result<Vec<JobSource>, anyhow::Error> {
    let mut sources = Vec::new();

    if let Some(urls) = matches.get_many::<String>("repo-url") {
        for url in urls {
            sources.push(JobSource::from_parts(Some(url), None)?);
        }
    }
    if let Some(paths) = matches.get_many::<String>("path") {
        for path in paths {
            let absolute = absolute_path(path)?;
            sources.push(JobSource::from_parts(None, Some(&absolute))?);
        }
    }

    if sources.is_empty() {
        bail!("nothing to analyze: pass --repo-url or --path");
    }
    Ok(sources)
}

fn build_sink(matches: &ArgMatches) -> Result<Arc<dyn MetricsSink>, anyhow::Error> {
    let token = matches
        .get_one::<String>("influx-token")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if matches.get_flag("dry-run") || token.is_empty() {
        tracing::warn!("no InfluxDB token or --dry-run given, records are kept in memory only");
        return Ok(Arc::new(MemorySink::new()));
    }

    let value = |arg: &str| matches.get_one::<String>(arg).cloned().unwrap_or_default();
    let config = InfluxConfig::new(
        value("influx-url"),
        token,
        value("influx-org"),
        value("influx-bucket"),
    );
    config.validate()?;
    Ok(Arc::new(InfluxSink::new(config)?))
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput<'a> {
    jobs: &'a [Job],
    pool: &'a PoolState,
}

fn analyze_handler(matches: &ArgMatches) -> Result<ExitCode, anyhow::Error> {
    let sources = collect_sources(matches)?;
    let range = explicit_range(matches)?;

    let pool_config = PoolConfig::new()
        .pool_size(
            matches
                .get_one::<usize>("workers")
                .copied()
                .unwrap_or(DEFAULT_POOL_SIZE),
        )
        .queue_capacity(
            matches
                .get_one::<usize>("queue-capacity")
                .copied()
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
        );
    let days = matches
        .get_one::<u32>("days")
        .copied()
        .unwrap_or(DEFAULT_CHURN_WINDOW_DAYS);
    let options = AnalysisOptions::new().churn_window_days(days);

    let clone_timeout = matches
        .get_one::<u64>("clone-timeout")
        .copied()
        .unwrap_or(DEFAULT_CLONE_TIMEOUT_SECS);
    let materializer = GitMaterializer::new().clone_timeout(Duration::from_secs(clone_timeout));

    let sink = build_sink(matches)?;
    let mut pool = WorkerPool::start(pool_config, options, Arc::new(materializer), sink)?;

    let mut rejected = 0usize;
    for source in sources {
        let mut request = JobRequest::new(source.clone());
        if let Some(range) = range {
            request = request.range(range);
        }
        if let Err(e) = pool.submit(request) {
            eprintln!("Error: {source}: {e}");
            rejected += 1;
        }
    }

    pool.shutdown();
    let jobs = pool.jobs();
    let state = pool.health();

    match OutputFormat::from_matches(matches) {
        OutputFormat::Json => print_json(&AnalyzeOutput {
            jobs: &jobs,
            pool: &state,
        })?,
        OutputFormat::Table => {
            print!("{}", render::render_jobs(&jobs));
            print!("{}", render::render_pool(&state));
        }
    }

    let failed = jobs.iter().any(|j| j.status == JobStatus::Failed);
    if failed || rejected > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let matches = build_command().get_matches();
    let result = match matches.subcommand() {
        Some(("loc", sub)) => loc_handler(sub),
        Some(("churn", sub)) => churn_handler(sub),
        Some(("analyze", sub)) => analyze_handler(sub),
        _ => loc_handler(&matches),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
