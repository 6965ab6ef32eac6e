//! Data collection: classify lines, count LOC and measure churn.
//!
//! - **Classification**: line-based classifier (`LineClassifier`, `gather_stats`)
//! - **Statistics**: core data structures (`Locs`, `FileStats`, `PackageStats`)
//! - **Counting**: directory-level API (`count_directory`, `count_file`)
//! - **Churn**: date-bounded churn aggregation (`analyze_churn`)
//! - **History**: git numstat collection (`commit_history`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use repopulselib::data::{count_directory, CountOptions};
//!
//! let result = count_directory(".", &CountOptions::new())?;
//! println!("Total code lines: {}", result.total.code);
//! ```

pub mod churn;
pub mod classifier;
pub mod counter;
pub mod history;
pub mod stats;

pub use churn::{
    analyze_churn, Churn, ChurnReport, CommitChurn, CommitNumstat, DateRange, FileNumstat,
    LineChanges,
};
pub use classifier::{gather_stats, gather_stats_for_path, LineClassifier, LineKind};
pub use counter::{
    count_directory, count_file, package_name, CountOptions, CountResult, ROOT_PACKAGE,
};
pub use history::{commit_history, head_info, line_changes, open_repository};
pub use stats::{language_label, weighted_loc, FileStats, Locs, PackageStats};
