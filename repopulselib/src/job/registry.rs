//! Authoritative record of every job the pool has accepted.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::RepopulseError;
use crate::Result;

use super::model::{Job, JobId};

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    /// Submission order
    order: Vec<JobId>,
}

/// Job store shared by the pool's submitters, readers and status updater.
///
/// Readers always get whole snapshots; every update runs under the write
/// lock so a half-applied transition is never visible.
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: RwLock<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        let mut inner = self.inner.write();
        inner.order.push(job.id);
        inner.jobs.insert(job.id, job);
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.inner.read().jobs.get(&id).cloned()
    }

    /// Apply `f` to a job in place.
    pub fn update<T, F>(&self, id: JobId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Job) -> Result<T>,
    {
        let mut inner = self.inner.write();
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| RepopulseError::JobNotFound(id.to_string()))?;
        f(job)
    }

    /// Snapshots of every job in submission order.
    pub fn snapshot(&self) -> Vec<Job> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::{JobRequest, JobSource, JobStatus};
    use chrono::Utc;

    fn job() -> Job {
        let source = JobSource::local_path("/srv/repo").unwrap();
        Job::new(JobId::new(), JobRequest::new(source), Utc::now())
    }

    #[test]
    fn test_insert_get_snapshot_order() {
        let registry = JobRegistry::new();
        let jobs: Vec<_> = (0..4).map(|_| job()).collect();
        for job in &jobs {
            registry.insert(job.clone());
        }

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get(jobs[2].id).unwrap().id, jobs[2].id);
        let ids: Vec<_> = registry.snapshot().iter().map(|j| j.id).collect();
        let expected: Vec<_> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_update_applies_transition() {
        let registry = JobRegistry::new();
        let job = job();
        let id = job.id;
        registry.insert(job);

        registry.update(id, |job| job.start(Utc::now())).unwrap();
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Processing);

        let again = registry.update(id, |job| job.start(Utc::now()));
        assert!(matches!(again, Err(RepopulseError::InvalidTransition { .. })));
    }

    #[test]
    fn test_unknown_id() {
        let registry = JobRegistry::new();
        assert!(registry.get(JobId::new()).is_none());
        assert!(matches!(
            registry.update(JobId::new(), |_| Ok(())),
            Err(RepopulseError::JobNotFound(_))
        ));
    }
}
