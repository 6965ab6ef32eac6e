//! Jobs: one tracked analysis request and its state machine.
//!
//! ```text
//! queued ──start──▶ processing ──complete──▶ completed
//!                        │
//!                        └──────fail──────▶ failed
//! ```
//!
//! Transitions only move forward and each happens at most once. Timestamps
//! are kept ordered: `created_at <= started_at <= completed_at`.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{Churn, DateRange, Locs};
use crate::error::{ErrorKind, RepopulseError};
use crate::Result;

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    // Static literal pattern; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^https?://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(\.git)?/?$")
        .expect("valid GitHub url pattern")
});

/// Unique job identifier, a random UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = RepopulseError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| RepopulseError::JobNotFound(s.to_string()))
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the code to analyze comes from. Validated at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum JobSource {
    /// `https://github.com/<owner>/<repo>[.git]`
    RepoUrl(String),
    /// Absolute path on the local filesystem
    LocalPath(PathBuf),
}

impl JobSource {
    pub fn repo_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RepopulseError::Validation("repository url is empty".into()));
        }
        if !GITHUB_URL.is_match(url) {
            return Err(RepopulseError::Validation(format!(
                "invalid repository url '{url}': expected https://github.com/<owner>/<repo>"
            )));
        }
        Ok(JobSource::RepoUrl(url.to_string()))
    }

    pub fn local_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = path.as_ref().to_string_lossy();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RepopulseError::Validation("local path is empty".into()));
        }
        let path = PathBuf::from(trimmed);
        if !path.is_absolute() {
            return Err(RepopulseError::Validation(format!(
                "local path must be absolute: '{}'",
                path.display()
            )));
        }
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(RepopulseError::Validation(format!(
                "local path must not contain '..': '{}'",
                path.display()
            )));
        }
        Ok(JobSource::LocalPath(path))
    }

    /// Build from optional request fields; exactly one must be set.
    pub fn from_parts(repo_url: Option<&str>, local_path: Option<&str>) -> Result<Self> {
        match (repo_url, local_path) {
            (Some(url), None) => Self::repo_url(url),
            (None, Some(path)) => Self::local_path(path),
            (Some(_), Some(_)) => Err(RepopulseError::Validation(
                "provide either a repository url or a local path, not both".into(),
            )),
            (None, None) => Err(RepopulseError::Validation(
                "a repository url or a local path is required".into(),
            )),
        }
    }

    /// Identifier used as the `repo_id` of every record.
    pub fn repo_id(&self) -> String {
        match self {
            JobSource::RepoUrl(url) => url.clone(),
            JobSource::LocalPath(path) => path.to_string_lossy().into_owned(),
        }
    }

    /// Last path segment, without a `.git` suffix.
    pub fn repo_name(&self) -> String {
        let id = self.repo_id();
        let trimmed = id.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            "unknown".to_string()
        } else {
            name.to_string()
        }
    }
}

impl std::fmt::Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSource::RepoUrl(url) => f.write_str(url),
            JobSource::LocalPath(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An analysis request as submitted to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub source: JobSource,
    /// Churn window; the configured trailing window when absent
    pub range: Option<DateRange>,
}

impl JobRequest {
    pub fn new(source: JobSource) -> Self {
        Self {
            source,
            range: None,
        }
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Re-check a request that may not have come through the constructors.
    pub fn validate(&self) -> Result<()> {
        match &self.source {
            JobSource::RepoUrl(url) => JobSource::repo_url(url)?,
            JobSource::LocalPath(path) => JobSource::local_path(path)?,
        };
        if let Some(range) = self.range {
            DateRange::new(range.start, range.end)?;
        }
        Ok(())
    }
}

/// Failure descriptor of a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&RepopulseError> for JobError {
    fn from(err: &RepopulseError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// LOC of one package in a job result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    pub language: String,
    pub file_count: usize,
    pub loc: Locs,
    pub weighted_loc: f64,
}

/// Churn part of a job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnSummary {
    pub range: DateRange,
    pub commit_count: usize,
    pub total: Churn,
    pub daily: BTreeMap<NaiveDate, Churn>,
}

/// Outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub repo_id: String,
    pub repo_name: String,
    pub branch: String,
    pub commit_hash: String,
    pub file_count: usize,
    pub package_count: usize,
    pub loc: Locs,
    pub weighted_loc: f64,
    pub packages: Vec<PackageSummary>,
    pub churn: ChurnSummary,
    /// Points handed to the metrics sink
    pub records_written: usize,
}

/// Snapshot of one job. The pool owns the authoritative copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub source: JobSource,
    pub range: Option<DateRange>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Percent done: 0 while queued or after a failure, 100 once completed
    pub progress: u8,
    pub result: Option<JobResult>,
    pub error: Option<JobError>,
}

/// Progress of a job that has just been picked up by a worker.
pub const PROGRESS_STARTED: u8 = 10;
/// Progress before a remote clone begins.
pub const PROGRESS_CLONING: u8 = 25;
/// Progress once the source is on disk.
pub const PROGRESS_RETRIEVED: u8 = 50;
/// Progress once LOC is counted.
pub const PROGRESS_COUNTED: u8 = 75;
pub const PROGRESS_DONE: u8 = 100;

impl Job {
    pub fn new(id: JobId, request: JobRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            source: request.source,
            range: request.range,
            created_at,
            started_at: None,
            completed_at: None,
            progress: 0,
            result: None,
            error: None,
        }
    }

    /// `queued → processing`
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.expect_status(JobStatus::Queued, JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        self.started_at = Some(at.max(self.created_at));
        self.progress = PROGRESS_STARTED;
        Ok(())
    }

    /// Record a pipeline milestone. Only moves forward, and only while
    /// processing; 100 is reserved for completion.
    pub fn advance(&mut self, percent: u8) -> Result<()> {
        self.expect_status(JobStatus::Processing, JobStatus::Processing)?;
        self.progress = self.progress.max(percent.min(PROGRESS_DONE - 1));
        Ok(())
    }

    /// `processing → completed`
    pub fn complete(&mut self, result: JobResult, at: DateTime<Utc>) -> Result<()> {
        self.expect_status(JobStatus::Processing, JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.completed_at = Some(self.clamp_finish(at));
        self.progress = PROGRESS_DONE;
        self.result = Some(result);
        Ok(())
    }

    /// `processing → failed`
    pub fn fail(&mut self, error: JobError, at: DateTime<Utc>) -> Result<()> {
        self.expect_status(JobStatus::Processing, JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.completed_at = Some(self.clamp_finish(at));
        self.progress = 0;
        self.error = Some(error);
        Ok(())
    }

    fn expect_status(&self, expected: JobStatus, to: JobStatus) -> Result<()> {
        if self.status != expected {
            return Err(RepopulseError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        Ok(())
    }

    fn clamp_finish(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at.max(self.started_at.unwrap_or(self.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job() -> Job {
        let source = JobSource::local_path("/srv/repo").unwrap();
        Job::new(JobId::new(), JobRequest::new(source), Utc::now())
    }

    fn result() -> JobResult {
        let range = DateRange::trailing_from_now(7);
        JobResult {
            repo_id: "/srv/repo".to_string(),
            repo_name: "repo".to_string(),
            branch: "main".to_string(),
            commit_hash: "unknown".to_string(),
            file_count: 0,
            package_count: 0,
            loc: Locs::new(),
            weighted_loc: 0.0,
            packages: Vec::new(),
            churn: ChurnSummary {
                range,
                commit_count: 0,
                total: Churn::default(),
                daily: BTreeMap::new(),
            },
            records_written: 1,
        }
    }

    #[test]
    fn test_repo_url_validation() {
        assert!(JobSource::repo_url("https://github.com/octo/widgets").is_ok());
        assert!(JobSource::repo_url("  https://github.com/octo/widgets.git/ ").is_ok());
        assert!(JobSource::repo_url("http://github.com/a-b/c_d.e").is_ok());

        for bad in [
            "",
            "   ",
            "https://gitlab.com/octo/widgets",
            "https://github.com/octo",
            "git@github.com:octo/widgets.git",
            "https://github.com/octo/widgets/tree/main",
        ] {
            assert!(
                matches!(JobSource::repo_url(bad), Err(RepopulseError::Validation(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_local_path_validation() {
        assert!(JobSource::local_path("/home/dev/project").is_ok());
        assert!(JobSource::local_path(" /home/dev/project ").is_ok());
        assert!(JobSource::local_path("relative/path").is_err());
        assert!(JobSource::local_path("/home/dev/../etc").is_err());
        assert!(JobSource::local_path("").is_err());
    }

    #[test]
    fn test_from_parts_requires_exactly_one() {
        assert!(JobSource::from_parts(Some("https://github.com/a/b"), None).is_ok());
        assert!(JobSource::from_parts(None, Some("/tmp/x")).is_ok());
        assert!(JobSource::from_parts(None, None).is_err());
        let both = JobSource::from_parts(Some("https://github.com/a/b"), Some("/tmp/x"));
        assert_eq!(both.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_request_validate_catches_deserialized_input() {
        let json = r#"{"source":{"kind":"local_path","value":"relative/dir"},"range":null}"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        let err = request.validate().unwrap_err();
        assert!(matches!(err, RepopulseError::Validation(_)));

        let json = r#"{"source":{"kind":"repo_url","value":"https://github.com/a/b"},
                       "range":{"start":"2025-06-07","end":"2025-06-01"}}"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_repo_name() {
        let url = JobSource::repo_url("https://github.com/octo/widgets.git").unwrap();
        assert_eq!(url.repo_name(), "widgets");
        assert_eq!(url.repo_id(), "https://github.com/octo/widgets.git");
        let path = JobSource::local_path("/srv/code/engine/").unwrap();
        assert_eq!(path.repo_name(), "engine");
    }

    #[test]
    fn test_forward_transitions() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Queued);

        job.start(Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        job.complete(result(), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.error.is_none());

        let started = job.started_at.unwrap();
        let completed = job.completed_at.unwrap();
        assert!(job.created_at <= started && started <= completed);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut job = job();
        assert!(matches!(
            job.complete(result(), Utc::now()),
            Err(RepopulseError::InvalidTransition { .. })
        ));

        job.start(Utc::now()).unwrap();
        assert!(job.start(Utc::now()).is_err());

        let error = JobError::new(ErrorKind::Retrieval, "clone failed");
        job.fail(error, Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.status.is_terminal());
        assert!(job.complete(result(), Utc::now()).is_err());
        let again = JobError::new(ErrorKind::Computation, "x");
        assert!(job.fail(again, Utc::now()).is_err());
        assert!(job.result.is_none());
        assert_eq!(job.error.as_ref().unwrap().kind, ErrorKind::Retrieval);
    }

    #[test]
    fn test_progress_follows_status() {
        let mut job = job();
        assert_eq!(job.progress, 0);
        assert!(job.advance(PROGRESS_RETRIEVED).is_err());

        job.start(Utc::now()).unwrap();
        assert_eq!(job.progress, PROGRESS_STARTED);
        job.advance(PROGRESS_COUNTED).unwrap();
        job.advance(PROGRESS_RETRIEVED).unwrap();
        assert_eq!(job.progress, PROGRESS_COUNTED);
        job.advance(PROGRESS_DONE).unwrap();
        assert_eq!(job.progress, PROGRESS_DONE - 1);

        job.complete(result(), Utc::now()).unwrap();
        assert_eq!(job.progress, PROGRESS_DONE);
        assert!(job.advance(PROGRESS_COUNTED).is_err());

        let mut failed = self::job();
        failed.start(Utc::now()).unwrap();
        failed.advance(PROGRESS_COUNTED).unwrap();
        let error = JobError::new(ErrorKind::Persistence, "down");
        failed.fail(error, Utc::now()).unwrap();
        assert_eq!(failed.progress, 0);
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut job = job();
        let earlier = job.created_at - Duration::seconds(30);
        job.start(earlier).unwrap();
        let error = JobError::new(ErrorKind::Computation, "boom");
        job.fail(error, earlier).unwrap();
        assert_eq!(job.started_at, Some(job.created_at));
        assert_eq!(job.completed_at, Some(job.created_at));
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!(matches!(
            "not-a-uuid".parse::<JobId>(),
            Err(RepopulseError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_serializes() {
        let job = job();
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["progress"], 0);
        assert_eq!(json["source"]["kind"], "local_path");
    }
}
