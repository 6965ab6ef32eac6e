//! Getting a job's source onto the local filesystem.
//!
//! Remote repositories are cloned into a temporary directory that lives as
//! long as the [`Checkout`]; local paths are analyzed in place. A clone that
//! outlives its timeout is interrupted and reported as a retrieval error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use tempfile::TempDir;

use crate::config::DEFAULT_CLONE_TIMEOUT_SECS;
use crate::data::{commit_history, head_info, open_repository, CommitNumstat, DateRange};
use crate::error::RepopulseError;
use crate::job::JobSource;
use crate::records::RepoContext;
use crate::Result;

/// Commit hash and branch recorded for unversioned directories.
pub const UNKNOWN_REVISION: &str = "unknown";

/// A source made available on disk.
#[derive(Debug)]
pub struct Checkout {
    /// Directory the analysis runs on
    pub root: PathBuf,
    pub repo_id: String,
    pub repo_name: String,
    pub branch: String,
    pub commit_hash: String,
    repository: Option<gix::Repository>,
    /// Keeps a cloned checkout alive; removed on drop.
    _workdir: Option<TempDir>,
}

impl Checkout {
    /// An unversioned checkout of `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        repo_id: impl Into<String>,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
            repo_name: repo_name.into(),
            branch: UNKNOWN_REVISION.to_string(),
            commit_hash: UNKNOWN_REVISION.to_string(),
            repository: None,
            _workdir: None,
        }
    }

    pub fn revision(mut self, branch: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        self.branch = branch.into();
        self.commit_hash = commit_hash.into();
        self
    }

    fn with_repository(mut self, repository: gix::Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    fn with_workdir(mut self, workdir: TempDir) -> Self {
        self._workdir = Some(workdir);
        self
    }

    pub fn repository(&self) -> Option<&gix::Repository> {
        self.repository.as_ref()
    }

    pub fn context(&self) -> RepoContext {
        RepoContext {
            repo_id: self.repo_id.clone(),
            repo_name: self.repo_name.clone(),
            branch: self.branch.clone(),
            commit_hash: self.commit_hash.clone(),
            project_name: self.repo_name.clone(),
        }
    }
}

/// Produces checkouts and their commit history.
pub trait Materializer: Send + Sync {
    /// Make `source` available on disk. Failures are retrieval errors.
    fn materialize(&self, source: &JobSource) -> Result<Checkout>;

    /// First-parent commits of the checkout within `range`, newest first.
    fn commit_history(&self, checkout: &Checkout, range: &DateRange) -> Result<Vec<CommitNumstat>>;
}

/// [`Materializer`] backed by git via `gix`.
#[derive(Debug, Clone, Copy)]
pub struct GitMaterializer {
    clone_timeout: Duration,
}

impl Default for GitMaterializer {
    fn default() -> Self {
        Self {
            clone_timeout: Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS),
        }
    }
}

impl GitMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on a remote clone, fetch and checkout included.
    pub fn clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    fn clone_remote(&self, url: &str, source: &JobSource) -> Result<Checkout> {
        let workdir = tempfile::Builder::new()
            .prefix("repopulse_clone_")
            .tempdir()
            .map_err(|e| RepopulseError::Retrieval(format!("failed to create clone dir: {}", e)))?;
        let dest = workdir.path().join("repo");

        tracing::info!(url, dest = %dest.display(), "cloning repository");
        let repository = clone_repository(url, &dest, self.clone_timeout)?;
        let (commit, branch) = head_info(&repository)?;
        tracing::info!(url, commit = %short_hash(&commit), "cloned repository");

        Ok(Checkout::new(dest, source.repo_id(), source.repo_name())
            .revision(branch, commit)
            .with_repository(repository)
            .with_workdir(workdir))
    }

    fn open_local(&self, path: &Path, source: &JobSource) -> Result<Checkout> {
        if !path.is_dir() {
            return Err(RepopulseError::PathNotFound(path.to_path_buf()));
        }

        let checkout = Checkout::new(path, source.repo_id(), source.repo_name());
        let Some(repository) = open_repository(path)? else {
            tracing::info!(path = %path.display(), "not a git repository; churn will be empty");
            return Ok(checkout);
        };

        match head_info(&repository) {
            Ok((commit, branch)) => Ok(checkout
                .revision(branch, commit)
                .with_repository(repository)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "repository has no readable HEAD"
                );
                Ok(checkout)
            }
        }
    }
}

impl Materializer for GitMaterializer {
    fn materialize(&self, source: &JobSource) -> Result<Checkout> {
        match source {
            JobSource::RepoUrl(url) => self.clone_remote(url, source),
            JobSource::LocalPath(path) => self.open_local(path, source),
        }
    }

    fn commit_history(&self, checkout: &Checkout, range: &DateRange) -> Result<Vec<CommitNumstat>> {
        match checkout.repository() {
            Some(repository) => commit_history(repository, range),
            None => Ok(Vec::new()),
        }
    }
}

/// Clone `url` into `dest`, giving up after `timeout`.
///
/// The clone runs on its own thread. On expiry the interrupt flag is raised
/// and the caller returns at once; the clone thread winds down on its own.
fn clone_repository(url: &str, dest: &Path, timeout: Duration) -> Result<gix::Repository> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = channel::bounded(1);

    {
        let interrupt = Arc::clone(&interrupt);
        let url = url.to_string();
        let dest = dest.to_path_buf();
        thread::Builder::new()
            .name("repopulse-clone".to_string())
            .spawn(move || {
                let _ = done_tx.send(fetch_and_checkout(&url, &dest, &interrupt));
            })
            .map_err(|e| RepopulseError::Retrieval(format!("failed to start clone: {}", e)))?;
    }

    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            interrupt.store(true, Ordering::SeqCst);
            tracing::warn!(url, timeout_secs = timeout.as_secs_f64(), "clone timed out");
            Err(RepopulseError::Retrieval(format!(
                "clone of {} timed out after {:?}",
                url, timeout
            )))
        }
        Err(RecvTimeoutError::Disconnected) => Err(RepopulseError::Retrieval(format!(
            "clone of {} stopped without a result",
            url
        ))),
    }
}

/// Full clone of `url` into `dest`, with the main worktree checked out.
fn fetch_and_checkout(url: &str, dest: &Path, interrupt: &AtomicBool) -> Result<gix::Repository> {
    let mut prepare = gix::prepare_clone(url, dest).map_err(|e| {
        RepopulseError::Retrieval(format!("failed to prepare clone of {}: {}", url, e))
    })?;

    let (mut checkout, _) = prepare
        .fetch_then_checkout(gix::progress::Discard, interrupt)
        .map_err(|e| RepopulseError::Retrieval(format!("git clone of {} failed: {}", url, e)))?;

    let (repository, _) = checkout
        .main_worktree(gix::progress::Discard, interrupt)
        .map_err(|e| RepopulseError::Retrieval(format!("checkout of {} failed: {}", url, e)))?;

    Ok(repository)
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
