//! Bounded FIFO of pending jobs.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use super::model::{JobId, JobRequest};

/// A job waiting for a worker.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: JobId,
    pub request: JobRequest,
}

#[derive(Debug)]
struct State {
    jobs: VecDeque<QueuedJob>,
    closed: bool,
}

/// Why a push was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    Full,
    Closed,
}

/// Capacity-bounded, insertion-ordered job queue.
///
/// `push` never blocks on capacity; `take` blocks until a job is available
/// or the queue is closed and drained.
#[derive(Debug)]
pub struct JobQueue {
    state: Mutex<State>,
    available: Condvar,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                jobs: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a job, running `admit` under the queue lock first.
    ///
    /// `admit` only runs once the push is known to succeed, so whatever it
    /// records is visible before any worker can take the job.
    pub fn push_with<F>(&self, job: QueuedJob, admit: F) -> Result<(), PushError>
    where
        F: FnOnce(&QueuedJob),
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PushError::Closed);
        }
        if state.jobs.len() >= self.capacity {
            return Err(PushError::Full);
        }
        admit(&job);
        state.jobs.push_back(job);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    pub fn push(&self, job: QueuedJob) -> Result<(), PushError> {
        self.push_with(job, |_| {})
    }

    /// Oldest job, blocking while the queue is open and empty.
    ///
    /// Returns `None` once the queue is closed and nothing is left.
    pub fn take(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Refuse further pushes and wake every waiting taker.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::JobSource;
    use std::sync::Arc;
    use std::thread;

    fn queued() -> QueuedJob {
        QueuedJob {
            id: JobId::new(),
            request: JobRequest::new(JobSource::local_path("/srv/repo").unwrap()),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new(3);
        let jobs: Vec<_> = (0..3).map(|_| queued()).collect();
        for job in &jobs {
            queue.push(job.clone()).unwrap();
        }
        for job in &jobs {
            assert_eq!(queue.take().unwrap().id, job.id);
        }
    }

    #[test]
    fn test_full_queue_rejects_without_admitting() {
        let queue = JobQueue::new(1);
        queue.push(queued()).unwrap();

        let mut admitted = false;
        let result = queue.push_with(queued(), |_| admitted = true);
        assert_eq!(result, Err(PushError::Full));
        assert!(!admitted);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_close_drains_then_stops() {
        let queue = JobQueue::new(2);
        queue.push(queued()).unwrap();
        queue.close();

        assert_eq!(queue.push(queued()), Err(PushError::Closed));
        assert!(queue.take().is_some());
        assert!(queue.take().is_none());
    }

    #[test]
    fn test_take_blocks_until_push() {
        let queue = Arc::new(JobQueue::new(1));
        let taker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take().map(|j| j.id))
        };

        let job = queued();
        let id = job.id;
        queue.push(job).unwrap();
        assert_eq!(taker.join().unwrap(), Some(id));
    }

    #[test]
    fn test_close_wakes_blocked_takers() {
        let queue = Arc::new(JobQueue::new(1));
        let takers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.take().is_none())
            })
            .collect();

        queue.close();
        for taker in takers {
            assert!(taker.join().unwrap());
        }
    }
}
