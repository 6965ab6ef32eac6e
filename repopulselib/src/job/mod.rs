//! Job execution: the job model, the bounded queue and the worker pool.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use repopulselib::{
//!     AnalysisOptions, GitMaterializer, JobRequest, JobSource, MemorySink, PoolConfig, WorkerPool,
//! };
//!
//! let mut pool = WorkerPool::start(
//!     PoolConfig::default(),
//!     AnalysisOptions::default(),
//!     Arc::new(GitMaterializer::new()),
//!     Arc::new(MemorySink::new()),
//! )?;
//! let id = pool.submit(JobRequest::new(JobSource::local_path("/srv/code/engine")?))?;
//! pool.shutdown();
//! println!("{}", pool.status(id)?.status);
//! ```

pub mod model;
pub mod monitor;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod registry;

pub use model::{
    ChurnSummary, Job, JobError, JobId, JobRequest, JobResult, JobSource, JobStatus, PackageSummary,
    PROGRESS_CLONING, PROGRESS_COUNTED, PROGRESS_DONE, PROGRESS_RETRIEVED, PROGRESS_STARTED,
};
pub use monitor::PoolState;
pub use pipeline::run_pipeline;
pub use pool::WorkerPool;
pub use queue::{JobQueue, PushError, QueuedJob};
pub use registry::JobRegistry;
