//! # repopulselib
//!
//! Repository size and churn analysis with a bounded job worker pool.
//!
//! ## Overview
//!
//! An analysis takes a repository (a GitHub URL or a local directory) and
//! produces two kinds of time-series observations:
//!
//! - **LOC**: code, comment and blank lines per file, per package (directory)
//!   and for the whole project, plus weighted LOC (`code + 0.5 × comments`)
//! - **Churn**: lines added, deleted and modified per commit and per UTC day
//!   over a date range of the first-parent history
//!
//! Analyses run as jobs on a [`WorkerPool`]: a fixed set of worker threads
//! fed by a capacity-bounded FIFO queue. Every job is tracked through
//! `queued → processing → completed | failed`.
//!
//! ## Pipeline
//!
//! 1. **Source** ([`source`]): language table, file discovery and filtering
//! 2. **Data** ([`data`]): line classification, LOC counting, churn
//! 3. **Records** ([`records`]): LOC and churn observations
//! 4. **Sink** ([`sink`]): where records are written (InfluxDB, memory)
//!
//! ## Example
//!
//! ```rust
//! use repopulselib::{count_directory, CountOptions, FilterConfig};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! fs::create_dir(dir.path().join("src")).unwrap();
//! fs::write(
//!     dir.path().join("src/Main.java"),
//!     "// entry\npublic class Main {\n    int x = 1; // one\n}\n",
//! )
//! .unwrap();
//!
//! let result = count_directory(dir.path(), &CountOptions::new()).unwrap();
//! assert_eq!(result.total.code, 2);
//! assert_eq!(result.total.comments, 1);
//! assert_eq!(result.total.blanks, 1);
//! assert_eq!(result.total.weighted(), 2.5);
//!
//! // Count with filtering
//! let filter = FilterConfig::new().exclude("**/generated/**").unwrap();
//! let result = count_directory(dir.path(), &CountOptions::new().filter(filter)).unwrap();
//! assert_eq!(result.packages[0].name, "src");
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod job;
pub mod materialize;
pub mod output;
pub mod records;
pub mod sink;
pub mod source;

pub use config::{AnalysisOptions, PoolConfig};
pub use data::{
    analyze_churn, count_directory, count_file, gather_stats, Churn, ChurnReport, CommitChurn,
    CommitNumstat, CountOptions, CountResult, DateRange, FileNumstat, FileStats, LineChanges,
    LineClassifier, LineKind, Locs, PackageStats,
};
pub use error::{ErrorKind, RepopulseError};
pub use job::{
    Job, JobError, JobId, JobRegistry, JobRequest, JobResult, JobSource, JobStatus, PoolState,
    WorkerPool,
};
pub use materialize::{Checkout, GitMaterializer, Materializer};
pub use output::{Aggregation, LocTable, TableRow};
pub use records::{ChurnRecord, ChurnScope, Granularity, LocRecord, RepoContext};
pub use sink::{InfluxConfig, InfluxSink, MemorySink, MetricsSink};
pub use source::{discover_files, CommentSyntax, FilterConfig, Language, LanguageTable};

/// Result type for repopulselib operations
pub type Result<T> = std::result::Result<T, RepopulseError>;
