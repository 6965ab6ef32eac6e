//! Metrics sinks: where analysis records end up.
//!
//! A [`MetricsSink`] accepts the LOC and churn records of one job as a
//! single batch. Every sink failure is a persistence error; the job that
//! produced the records fails even though its computation succeeded.

pub mod influx;
pub mod line_protocol;

use parking_lot::Mutex;

use crate::records::{ChurnRecord, LocRecord};
use crate::Result;

pub use influx::{InfluxConfig, InfluxSink};

/// Destination for analysis records.
pub trait MetricsSink: Send + Sync {
    /// Store both record sets. Either all of them are accepted or none are.
    fn write(&self, loc: &[LocRecord], churn: &[ChurnRecord]) -> Result<()>;
}

/// Sink that keeps every record in memory.
///
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    loc: Mutex<Vec<LocRecord>>,
    churn: Mutex<Vec<ChurnRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loc_records(&self) -> Vec<LocRecord> {
        self.loc.lock().clone()
    }

    pub fn churn_records(&self) -> Vec<ChurnRecord> {
        self.churn.lock().clone()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.loc.lock().len() + self.churn.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsSink for MemorySink {
    fn write(&self, loc: &[LocRecord], churn: &[ChurnRecord]) -> Result<()> {
        self.loc.lock().extend_from_slice(loc);
        self.churn.lock().extend_from_slice(churn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ChurnScope, Granularity};
    use chrono::{NaiveDate, Utc};

    fn loc_record() -> LocRecord {
        LocRecord {
            repo_id: "r".to_string(),
            repo_name: "r".to_string(),
            branch: "main".to_string(),
            commit_hash: "abc".to_string(),
            language: "rust".to_string(),
            granularity: Granularity::Project,
            project_name: "r".to_string(),
            package_name: None,
            file_path: None,
            total_loc: 3,
            code_loc: 2,
            comment_loc: 1,
            blank_loc: 0,
            weighted_loc: 2.5,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_memory_sink_collects_batches() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        let churn = ChurnRecord {
            repo_id: "r".to_string(),
            repo_name: "r".to_string(),
            branch: "main".to_string(),
            scope: ChurnScope::Day {
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            },
            added: 1,
            deleted: 0,
            modified: 0,
            total: 1,
        };
        sink.write(&[loc_record(), loc_record()], &[churn]).unwrap();
        sink.write(&[loc_record()], &[]).unwrap();

        assert_eq!(sink.loc_records().len(), 3);
        assert_eq!(sink.churn_records().len(), 1);
        assert_eq!(sink.len(), 4);
    }
}
