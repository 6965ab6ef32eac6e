//! Time-series records produced by an analysis.
//!
//! Records are plain immutable values: one [`LocRecord`] per file, per
//! package and for the whole project, and one [`ChurnRecord`] per commit and
//! per UTC day with activity. Sinks decide how they are stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{language_label, Churn, ChurnReport, CountResult, Locs};

/// Level a [`LocRecord`] is aggregated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Project,
    Package,
    File,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Project => "project",
            Granularity::Package => "package",
            Granularity::File => "file",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository identity shared by every record of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub repo_id: String,
    pub repo_name: String,
    pub branch: String,
    pub commit_hash: String,
    pub project_name: String,
}

/// Lines-of-code observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub branch: String,
    pub commit_hash: String,
    /// Language name, or `mixed` when the scope spans several
    pub language: String,
    pub granularity: Granularity,
    pub project_name: String,
    pub package_name: Option<String>,
    pub file_path: Option<String>,
    pub total_loc: u64,
    pub code_loc: u64,
    pub comment_loc: u64,
    pub blank_loc: u64,
    pub weighted_loc: f64,
    pub collected_at: DateTime<Utc>,
}

impl LocRecord {
    fn new(
        context: &RepoContext,
        granularity: Granularity,
        language: String,
        stats: Locs,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            repo_id: context.repo_id.clone(),
            repo_name: context.repo_name.clone(),
            branch: context.branch.clone(),
            commit_hash: context.commit_hash.clone(),
            language,
            granularity,
            project_name: context.project_name.clone(),
            package_name: None,
            file_path: None,
            total_loc: stats.total,
            code_loc: stats.code,
            comment_loc: stats.comments,
            blank_loc: stats.blanks,
            weighted_loc: stats.weighted(),
            collected_at,
        }
    }
}

/// What a [`ChurnRecord`] covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ChurnScope {
    Commit {
        hash: String,
        committed_at: DateTime<Utc>,
    },
    Day {
        date: NaiveDate,
    },
}

impl ChurnScope {
    pub fn name(&self) -> &'static str {
        match self {
            ChurnScope::Commit { .. } => "commit",
            ChurnScope::Day { .. } => "day",
        }
    }

    /// Point in time the observation is stored at.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChurnScope::Commit { committed_at, .. } => *committed_at,
            ChurnScope::Day { date } => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

/// Code churn observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub branch: String,
    #[serde(flatten)]
    pub scope: ChurnScope,
    pub added: u64,
    pub deleted: u64,
    pub modified: u64,
    pub total: u64,
}

impl ChurnRecord {
    fn new(context: &RepoContext, scope: ChurnScope, churn: Churn) -> Self {
        Self {
            repo_id: context.repo_id.clone(),
            repo_name: context.repo_name.clone(),
            branch: context.branch.clone(),
            scope,
            added: churn.added,
            deleted: churn.deleted,
            modified: churn.modified,
            total: churn.total,
        }
    }
}

/// Build file, package and project records from a count.
///
/// Records are ordered files first, then packages, then the project.
pub fn loc_records(
    context: &RepoContext,
    result: &CountResult,
    collected_at: DateTime<Utc>,
) -> Vec<LocRecord> {
    let mut records = Vec::with_capacity(result.files.len() + result.packages.len() + 1);

    for file in &result.files {
        let path = file.path.to_string_lossy().replace('\\', "/");
        let mut record = LocRecord::new(
            context,
            Granularity::File,
            file.language.name().to_string(),
            file.stats,
            collected_at,
        );
        record.package_name = Some(crate::data::package_name(&file.path));
        record.file_path = Some(path);
        records.push(record);
    }

    for package in &result.packages {
        let mut record = LocRecord::new(
            context,
            Granularity::Package,
            language_label(&package.languages),
            package.stats,
            collected_at,
        );
        record.package_name = Some(package.name.clone());
        records.push(record);
    }

    records.push(LocRecord::new(
        context,
        Granularity::Project,
        language_label(&result.languages),
        result.total,
        collected_at,
    ));

    records
}

/// Build one record per commit followed by one per active day.
pub fn churn_records(context: &RepoContext, report: &ChurnReport) -> Vec<ChurnRecord> {
    let commits = report.commits.iter().map(|commit| {
        ChurnRecord::new(
            context,
            ChurnScope::Commit {
                hash: commit.id.clone(),
                committed_at: commit.committed_at,
            },
            commit.churn,
        )
    });
    let days = report
        .daily
        .iter()
        .map(|(date, churn)| ChurnRecord::new(context, ChurnScope::Day { date: *date }, *churn));

    commits.chain(days).collect()
}
