//! Code churn aggregation.
//!
//! Churn is computed from per-commit, per-file numstat data: lines added
//! and deleted in each text file a commit touched. Binary files carry no
//! line counts and are excluded from every total.
//!
//! For any set of changes:
//!
//! - `added` / `deleted` are plain sums
//! - `modified = min(added, deleted)`
//! - `total = added + deleted`
//!
//! `modified` is derived from the summed counts, never summed itself, so a
//! daily bucket is not the sum of its commits' `modified` values.

use std::collections::BTreeMap;
use std::ops::Add;
use std::path::PathBuf;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RepopulseError;
use crate::Result;

/// Lines changed in one file of one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineChanges {
    Text { added: u64, deleted: u64 },
    /// Binary content: no line counts, excluded from churn
    Binary,
}

/// Numstat entry for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNumstat {
    pub path: PathBuf,
    pub changes: LineChanges,
}

impl FileNumstat {
    pub fn text(path: impl Into<PathBuf>, added: u64, deleted: u64) -> Self {
        Self {
            path: path.into(),
            changes: LineChanges::Text { added, deleted },
        }
    }

    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            changes: LineChanges::Binary,
        }
    }
}

/// Numstat for one commit on the analyzed history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNumstat {
    /// Full commit hash
    pub id: String,
    /// Committer time
    pub committed_at: DateTime<Utc>,
    pub files: Vec<FileNumstat>,
}

/// Added/deleted/modified/total line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Churn {
    pub added: u64,
    pub deleted: u64,
    pub modified: u64,
    pub total: u64,
}

impl Churn {
    /// Derive the four metrics from raw added/deleted counts.
    pub fn new(added: u64, deleted: u64) -> Self {
        Self {
            added,
            deleted,
            modified: added.min(deleted),
            total: added + deleted,
        }
    }

    /// Aggregate a commit's files, skipping binary entries.
    pub fn from_files(files: &[FileNumstat]) -> Self {
        let mut total = Self::default();
        for file in files {
            if let LineChanges::Text { added, deleted } = file.changes {
                total = total + Self::new(added, deleted);
            }
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl Add for Churn {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.added + other.added, self.deleted + other.deleted)
    }
}

/// Inclusive range of UTC calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(RepopulseError::Validation(format!(
                "start date ({start}) must be <= end date ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date("start", start)?, parse_date("end", end)?)
    }

    /// The `days` calendar days ending at `today`, both ends included.
    ///
    /// `days` of zero is treated as one.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let back = u64::from(days.max(1) - 1);
        let start = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        Self { start, end: today }
    }

    /// The `days` calendar days ending today in UTC.
    pub fn trailing_from_now(days: u32) -> Self {
        Self::trailing(Utc::now().date_naive(), days)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn contains_time(&self, time: &DateTime<Utc>) -> bool {
        self.contains(time.date_naive())
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn parse_date(which: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        RepopulseError::Validation(format!("invalid {which} date '{value}': {e}"))
    })
}

/// Churn of a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitChurn {
    pub id: String,
    pub committed_at: DateTime<Utc>,
    pub churn: Churn,
    /// Text files counted
    pub files_changed: usize,
    /// Binary files skipped
    pub binary_files: usize,
}

/// Churn over a date range: overall, per commit and per UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnReport {
    pub range: DateRange,
    pub total: Churn,
    /// Commits in history order
    pub commits: Vec<CommitChurn>,
    /// One bucket per day with at least one commit
    pub daily: BTreeMap<NaiveDate, Churn>,
}

impl ChurnReport {
    pub fn empty(range: DateRange) -> Self {
        Self {
            range,
            total: Churn::default(),
            commits: Vec::new(),
            daily: BTreeMap::new(),
        }
    }
}

/// Aggregate commit numstats into a churn report.
///
/// Commits dated outside `range` (by UTC calendar date) are ignored.
pub fn analyze_churn(commits: &[CommitNumstat], range: DateRange) -> ChurnReport {
    let mut report = ChurnReport::empty(range);

    for commit in commits {
        if !range.contains_time(&commit.committed_at) {
            continue;
        }

        let churn = Churn::from_files(&commit.files);
        let binary_files = commit
            .files
            .iter()
            .filter(|f| matches!(f.changes, LineChanges::Binary))
            .count();

        report.total = report.total + churn;
        let day = report
            .daily
            .entry(commit.committed_at.date_naive())
            .or_default();
        *day = *day + churn;

        report.commits.push(CommitChurn {
            id: commit.id.clone(),
            committed_at: commit.committed_at,
            churn,
            files_changed: commit.files.len() - binary_files,
            binary_files,
        });
    }

    tracing::debug!(
        range = %range,
        commits = report.commits.len(),
        days = report.daily.len(),
        total = report.total.total,
        "churn aggregated"
    );

    report
}
