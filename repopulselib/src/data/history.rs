//! Git history reading for churn analysis.
//!
//! Walks the first-parent history of HEAD and produces a numstat entry per
//! commit in the requested date range: lines added and deleted per file,
//! compared against the first parent (or the empty tree for a root commit).
//! Binary blobs are reported as such and carry no line counts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gix::diff::blob::{diff, intern::InternedInput, sink::Counter, Algorithm};

use crate::error::RepopulseError;
use crate::Result;

use super::churn::{CommitNumstat, DateRange, FileNumstat, LineChanges};

/// Bytes inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8000;

/// Whether content looks binary: a NUL byte near the start.
pub fn is_binary(data: &[u8]) -> bool {
    data.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0)
}

/// Line additions/deletions between two blob contents.
pub fn line_changes(old: &[u8], new: &[u8]) -> LineChanges {
    if is_binary(old) || is_binary(new) {
        return LineChanges::Binary;
    }

    let input = InternedInput::new(old, new);
    let counter = diff(Algorithm::Histogram, &input, Counter::default());

    LineChanges::Text {
        added: u64::from(counter.insertions),
        deleted: u64::from(counter.removals),
    }
}

/// Open the repository rooted exactly at `path`, if there is one.
///
/// Parent directories are not searched, so an unversioned directory nested
/// inside another repository is reported as unversioned.
pub fn open_repository(path: &Path) -> Result<Option<gix::Repository>> {
    if !path.join(".git").exists() {
        return Ok(None);
    }
    gix::open(path)
        .map(Some)
        .map_err(|e| RepopulseError::GitError(format!("Failed to open repository: {}", e)))
}

/// HEAD commit hash and short branch name (`HEAD` when detached).
pub fn head_info(repo: &gix::Repository) -> Result<(String, String)> {
    let id = repo
        .head_id()
        .map_err(|e| RepopulseError::GitError(format!("Failed to resolve HEAD: {}", e)))?;

    let branch = repo
        .head_name()
        .map_err(|e| RepopulseError::GitError(format!("Failed to read HEAD: {}", e)))?
        .map(|name| name.shorten().to_string())
        .unwrap_or_else(|| "HEAD".to_string());

    Ok((id.to_string(), branch))
}

/// Numstat of every first-parent commit of HEAD dated within `range`.
///
/// Commits are returned newest first.
pub fn commit_history(repo: &gix::Repository, range: &DateRange) -> Result<Vec<CommitNumstat>> {
    let head = repo
        .head_id()
        .map_err(|e| RepopulseError::GitError(format!("Failed to resolve HEAD: {}", e)))?;

    let walk = repo
        .rev_walk([head.detach()])
        .first_parent_only()
        .all()
        .map_err(|e| RepopulseError::GitError(format!("Failed to walk history: {}", e)))?;

    let mut commits = Vec::new();

    for info in walk {
        let info = info
            .map_err(|e| RepopulseError::GitError(format!("Failed to walk history: {}", e)))?;
        let commit = info
            .object()
            .map_err(|e| RepopulseError::GitError(format!("Failed to find commit: {}", e)))?;

        let time = commit
            .time()
            .map_err(|e| RepopulseError::GitError(format!("Failed to read commit time: {}", e)))?;
        let Some(committed_at) = DateTime::<Utc>::from_timestamp(time.seconds, 0) else {
            tracing::warn!(commit = %info.id, "skipping commit with out-of-range timestamp");
            continue;
        };

        if !range.contains_time(&committed_at) {
            continue;
        }

        let files = commit_numstat(repo, &commit)?;
        commits.push(CommitNumstat {
            id: info.id.to_string(),
            committed_at,
            files,
        });
    }

    Ok(commits)
}

/// Numstat of one commit against its first parent.
fn commit_numstat(repo: &gix::Repository, commit: &gix::Commit<'_>) -> Result<Vec<FileNumstat>> {
    let tree = commit
        .tree()
        .map_err(|e| RepopulseError::GitError(format!("Failed to get commit tree: {}", e)))?;

    let parent_tree = match commit.parent_ids().next() {
        Some(parent_id) => repo
            .find_commit(parent_id)
            .map_err(|e| RepopulseError::GitError(format!("Failed to find parent: {}", e)))?
            .tree()
            .map_err(|e| RepopulseError::GitError(format!("Failed to get parent tree: {}", e)))?,
        None => repo.empty_tree(),
    };

    let changes = compute_tree_diff(&parent_tree, &tree)?;

    changes
        .into_iter()
        .map(|change| {
            let old = change.old_oid.map(|oid| read_blob(repo, oid)).transpose()?;
            let new = change.new_oid.map(|oid| read_blob(repo, oid)).transpose()?;
            let changes = line_changes(
                old.as_deref().unwrap_or_default(),
                new.as_deref().unwrap_or_default(),
            );
            Ok(FileNumstat {
                path: change.path,
                changes,
            })
        })
        .collect()
}

/// Internal representation of a file change
struct FileChange {
    path: PathBuf,
    old_oid: Option<gix::ObjectId>,
    new_oid: Option<gix::ObjectId>,
}

/// Compute the blob-level changes between two trees
fn compute_tree_diff(
    from_tree: &gix::Tree<'_>,
    to_tree: &gix::Tree<'_>,
) -> Result<Vec<FileChange>> {
    use gix::object::tree::diff::Action;

    let mut changes = Vec::new();

    from_tree
        .changes()
        .map_err(|e| RepopulseError::GitError(format!("Failed to get tree changes: {}", e)))?
        .for_each_to_obtain_tree(to_tree, |change| {
            use gix::object::tree::diff::Change;

            let file_change = match change {
                Change::Addition {
                    entry_mode,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() => Some(FileChange {
                    path: PathBuf::from(gix::path::from_bstr(location)),
                    old_oid: None,
                    new_oid: Some(id.detach()),
                }),
                Change::Deletion {
                    entry_mode,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() => Some(FileChange {
                    path: PathBuf::from(gix::path::from_bstr(location)),
                    old_oid: Some(id.detach()),
                    new_oid: None,
                }),
                Change::Modification {
                    previous_entry_mode,
                    entry_mode,
                    previous_id,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() && previous_entry_mode.is_blob() => Some(FileChange {
                    path: PathBuf::from(gix::path::from_bstr(location)),
                    old_oid: Some(previous_id.detach()),
                    new_oid: Some(id.detach()),
                }),
                Change::Rewrite {
                    source_id,
                    entry_mode,
                    id,
                    location,
                    ..
                } if entry_mode.is_blob() => Some(FileChange {
                    path: PathBuf::from(gix::path::from_bstr(location)),
                    old_oid: Some(source_id.detach()),
                    new_oid: Some(id.detach()),
                }),
                _ => None,
            };

            if let Some(fc) = file_change {
                changes.push(fc);
            }
            Ok::<_, std::convert::Infallible>(Action::Continue)
        })
        .map_err(|e| RepopulseError::GitError(format!("Failed to compute tree diff: {}", e)))?;

    Ok(changes)
}

/// Read a blob's raw content
fn read_blob(repo: &gix::Repository, oid: gix::ObjectId) -> Result<Vec<u8>> {
    let object = repo
        .find_object(oid)
        .map_err(|e| RepopulseError::GitError(format!("Failed to find object {}: {}", oid, e)))?;

    let blob = object
        .try_into_blob()
        .map_err(|_| RepopulseError::GitError(format!("Object {} is not a blob", oid)))?;

    Ok(blob.data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    #[test]
    fn test_is_binary() {
        assert!(is_binary(b"\x00\x01\x02\x03\x04"));
        assert!(!is_binary(b"plain text\nmore text\n"));
        assert!(!is_binary(b""));
    }

    #[test]
    fn test_line_changes_added_file() {
        let changes = line_changes(b"", b"one\ntwo\nthree\n");
        assert_eq!(
            changes,
            LineChanges::Text {
                added: 3,
                deleted: 0,
            }
        );
    }

    #[test]
    fn test_line_changes_modified_line() {
        let changes = line_changes(b"a\nb\nc\n", b"a\nB\nc\nd\n");
        assert_eq!(
            changes,
            LineChanges::Text {
                added: 2,
                deleted: 1,
            }
        );
    }

    #[test]
    fn test_line_changes_binary() {
        assert_eq!(line_changes(b"", b"\x00\x01\x02"), LineChanges::Binary);
        assert_eq!(line_changes(b"\x00png", b"text\n"), LineChanges::Binary);
    }

    #[test]
    fn test_open_repository_plain_directory() {
        let temp = tempdir().unwrap();
        assert!(open_repository(temp.path()).unwrap().is_none());
    }

    fn git(dir: &Path, args: &[&str], date: Option<&str>) -> bool {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com");
        if let Some(date) = date {
            cmd.env("GIT_AUTHOR_DATE", date)
                .env("GIT_COMMITTER_DATE", date);
        }
        cmd.output().map(|o| o.status.success()).unwrap_or(false)
    }

    #[test]
    fn test_commit_history_from_git_repository() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        if !git(dir, &["init", "-q"], None) {
            // git is not installed; nothing to exercise
            return;
        }

        std::fs::write(dir.join("a.txt"), "start\n").unwrap();
        assert!(git(dir, &["add", "a.txt"], None));
        assert!(git(
            dir,
            &["commit", "-q", "-m", "add a"],
            Some("2026-02-01T00:00:00+00:00")
        ));

        std::fs::write(dir.join("data.bin"), b"\x00\x01\x02\x03").unwrap();
        std::fs::write(dir.join("a.txt"), "start\nmore\n").unwrap();
        assert!(git(dir, &["add", "."], None));
        assert!(git(
            dir,
            &["commit", "-q", "-m", "binary and text"],
            Some("2026-02-03T23:59:59+00:00")
        ));

        std::fs::write(dir.join("b.txt"), "late\n").unwrap();
        assert!(git(dir, &["add", "b.txt"], None));
        assert!(git(
            dir,
            &["commit", "-q", "-m", "out of range"],
            Some("2026-02-05T10:00:00+00:00")
        ));

        let repo = open_repository(dir).unwrap().unwrap();
        let range = DateRange::parse("2026-02-01", "2026-02-03").unwrap();
        let commits = commit_history(&repo, &range).unwrap();

        assert_eq!(commits.len(), 2);
        let newest = &commits[0];
        assert!(newest.files.contains(&FileNumstat::binary("data.bin")));
        assert!(newest.files.contains(&FileNumstat::text("a.txt", 1, 0)));

        let root = &commits[1];
        assert_eq!(root.files, vec![FileNumstat::text("a.txt", 1, 0)]);

        let (head, _branch) = head_info(&repo).unwrap();
        assert_eq!(head.len(), 40);
    }
}
