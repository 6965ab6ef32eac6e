//! Bounded worker pool running analysis jobs.
//!
//! ```text
//! submit ─▶ JobQueue ─take─▶ worker 1..N ─JobEvent─▶ status updater ─▶ JobRegistry
//!   │                                                                    ▲
//!   └──────────────────────── insert (queued) ───────────────────────────┘
//! ```
//!
//! Submission inserts the job into the registry while holding the queue
//! lock, so a job is never in the queue without a registry entry. After
//! that, the status updater thread is the only writer: workers report
//! `Started`, `Progress` and `Finished` events over a channel and the
//! updater applies them in order.
//!
//! Workers never die from a job: errors and panics inside the pipeline become
//! a `failed` job. Shutdown stops new submissions, lets the workers drain
//! what is already queued and then joins every thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};

use crate::config::{AnalysisOptions, PoolConfig};
use crate::error::{ErrorKind, RepopulseError};
use crate::materialize::Materializer;
use crate::sink::MetricsSink;
use crate::Result;

use super::model::{Job, JobError, JobId, JobRequest, JobResult};
use super::monitor::PoolState;
use super::pipeline::run_pipeline;
use super::queue::{JobQueue, PushError, QueuedJob};
use super::registry::JobRegistry;

/// Transition reported by a worker.
#[derive(Debug)]
enum JobEvent {
    Started {
        id: JobId,
        at: DateTime<Utc>,
    },
    Progress {
        id: JobId,
        percent: u8,
    },
    Finished {
        id: JobId,
        outcome: std::result::Result<JobResult, JobError>,
        at: DateTime<Utc>,
    },
}

/// State shared by the pool handle and its threads.
struct Shared {
    queue: JobQueue,
    registry: Arc<JobRegistry>,
    busy: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    materializer: Arc<dyn Materializer>,
    sink: Arc<dyn MetricsSink>,
    options: AnalysisOptions,
}

/// A fixed set of worker threads fed by a bounded FIFO queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    config: PoolConfig,
    workers: Vec<JoinHandle<()>>,
    updater: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Validate the configuration and start every thread.
    pub fn start(
        config: PoolConfig,
        options: AnalysisOptions,
        materializer: Arc<dyn Materializer>,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        let registry = Arc::new(JobRegistry::new());
        Self::with_registry(config, options, materializer, sink, registry)
    }

    /// Like [`WorkerPool::start`], recording jobs in a caller-owned registry.
    ///
    /// The caller keeps read access to every job through its own handle,
    /// including after the pool is dropped.
    pub fn with_registry(
        config: PoolConfig,
        options: AnalysisOptions,
        materializer: Arc<dyn Materializer>,
        sink: Arc<dyn MetricsSink>,
        registry: Arc<JobRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        options.validate()?;

        let shared = Arc::new(Shared {
            queue: JobQueue::new(config.queue_capacity),
            registry,
            busy: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            materializer,
            sink,
            options,
        });

        let (events_tx, events_rx) = channel::unbounded();

        let updater = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("repopulse-status".to_string())
                .spawn(move || apply_events(&shared, events_rx))?
        };

        let mut pool = Self {
            shared,
            config,
            workers: Vec::with_capacity(config.pool_size),
            updater: Some(updater),
        };

        for index in 0..config.pool_size {
            let shared = Arc::clone(&pool.shared);
            let events = events_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("repopulse-worker-{index}"))
                .spawn(move || worker_loop(index, &shared, &events));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    drop(events_tx);
                    pool.shutdown();
                    return Err(RepopulseError::Io(e));
                }
            }
        }

        tracing::info!(
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Ok(pool)
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Queue a job and return its id.
    ///
    /// Fails fast: a full queue is a capacity error, never a wait.
    pub fn submit(&self, request: JobRequest) -> Result<JobId> {
        request.validate()?;

        let id = JobId::new();
        let source = request.source.to_string();
        let queued = QueuedJob { id, request };
        let registry = &self.shared.registry;

        self.shared
            .queue
            .push_with(queued, |job| {
                registry.insert(Job::new(job.id, job.request.clone(), Utc::now()));
            })
            .map_err(|e| match e {
                PushError::Full => {
                    let capacity = self.config.queue_capacity;
                    tracing::warn!(%source, capacity, "queue full, job rejected");
                    RepopulseError::Capacity { capacity }
                }
                PushError::Closed => RepopulseError::PoolShutdown,
            })?;

        tracing::info!(job_id = %id, %source, "job queued");
        Ok(id)
    }

    /// Snapshot of one job.
    pub fn status(&self, id: JobId) -> Result<Job> {
        self.shared
            .registry
            .get(id)
            .ok_or_else(|| RepopulseError::JobNotFound(id.to_string()))
    }

    /// Snapshots of every job in submission order.
    pub fn jobs(&self) -> Vec<Job> {
        self.shared.registry.snapshot()
    }

    /// Pool health; never waits on a running job.
    pub fn health(&self) -> PoolState {
        let shared = &self.shared;
        PoolState {
            pool_size: self.config.pool_size,
            busy_workers: shared.busy.load(Ordering::SeqCst),
            queue_depth: shared.queue.len(),
            queue_capacity: shared.queue.capacity(),
            completed: shared.completed.load(Ordering::SeqCst),
            failed: shared.failed.load(Ordering::SeqCst),
            submitted: shared.registry.len(),
            accepting: !shared.queue.is_closed(),
        }
    }

    /// Stop accepting jobs, finish the queued ones and join every thread.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.updater.is_none() {
            return;
        }

        tracing::info!(queued = self.shared.queue.len(), "worker pool shutting down");
        self.shared.queue.close();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside a job");
            }
        }
        if let Some(updater) = self.updater.take() {
            if updater.join().is_err() {
                tracing::error!("status updater panicked");
            }
        }

        let state = self.health();
        tracing::info!(
            completed = state.completed,
            failed = state.failed,
            "worker pool stopped"
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(index: usize, shared: &Shared, events: &Sender<JobEvent>) {
    tracing::debug!(worker = index, "worker started");

    while let Some(job) = shared.queue.take() {
        shared.busy.fetch_add(1, Ordering::SeqCst);
        let _ = events.send(JobEvent::Started {
            id: job.id,
            at: Utc::now(),
        });
        tracing::info!(
            job_id = %job.id,
            worker = index,
            source = %job.request.source,
            "job started"
        );

        let report = |percent: u8| {
            let _ = events.send(JobEvent::Progress { id: job.id, percent });
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_pipeline(
                job.id,
                &job.request,
                shared.materializer.as_ref(),
                shared.sink.as_ref(),
                &shared.options,
                &report,
            )
        }));

        let outcome = match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(JobError::from(&err)),
            Err(payload) => Err(JobError::new(
                ErrorKind::Computation,
                format!("analysis panicked: {}", panic_message(payload.as_ref())),
            )),
        };

        match &outcome {
            Ok(result) => tracing::info!(
                job_id = %job.id,
                files = result.file_count,
                loc = result.loc.code,
                "job completed"
            ),
            Err(error) => tracing::warn!(
                job_id = %job.id,
                kind = %error.kind,
                error = %error.message,
                "job failed"
            ),
        }

        shared.busy.fetch_sub(1, Ordering::SeqCst);
        let _ = events.send(JobEvent::Finished {
            id: job.id,
            outcome,
            at: Utc::now(),
        });
    }

    tracing::debug!(worker = index, "worker stopped");
}

/// Status updater: the single writer of post-submission transitions.
///
/// Runs until every worker has dropped its sender.
fn apply_events(shared: &Shared, events: Receiver<JobEvent>) {
    for event in events {
        match event {
            JobEvent::Started { id, at } => {
                if let Err(e) = shared.registry.update(id, |job| job.start(at)) {
                    tracing::error!(job_id = %id, error = %e, "rejected start transition");
                }
            }
            JobEvent::Progress { id, percent } => {
                if let Err(e) = shared.registry.update(id, |job| job.advance(percent)) {
                    tracing::debug!(job_id = %id, percent, error = %e, "progress dropped");
                }
            }
            JobEvent::Finished { id, outcome, at } => {
                let (applied, counter) = match outcome {
                    Ok(result) => (
                        shared.registry.update(id, |job| job.complete(result, at)),
                        &shared.completed,
                    ),
                    Err(error) => (
                        shared.registry.update(id, |job| job.fail(error, at)),
                        &shared.failed,
                    ),
                };
                match applied {
                    Ok(()) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        tracing::error!(job_id = %id, error = %e, "rejected finish transition")
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
