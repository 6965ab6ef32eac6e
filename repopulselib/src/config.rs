//! Configuration values built once at startup and handed to the pool.

use crate::data::CountOptions;
use crate::error::RepopulseError;
use crate::source::{FilterConfig, LanguageTable};
use crate::Result;

pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_CHURN_WINDOW_DAYS: u32 = 7;
/// Seconds a remote clone may take before the job fails with a retrieval error.
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 120;

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads
    pub pool_size: usize,
    /// Maximum number of queued (not yet started) jobs
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(RepopulseError::Config("pool size must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(RepopulseError::Config("queue capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// What every analysis job counts and over which default window.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub filter: FilterConfig,
    pub languages: LanguageTable,
    /// Days in the churn window used when a job carries no date range
    pub churn_window_days: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            languages: LanguageTable::default(),
            churn_window_days: DEFAULT_CHURN_WINDOW_DAYS,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn languages(mut self, languages: LanguageTable) -> Self {
        self.languages = languages;
        self
    }

    pub fn churn_window_days(mut self, days: u32) -> Self {
        self.churn_window_days = days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.churn_window_days == 0 {
            return Err(RepopulseError::Config("churn window must be at least 1 day".into()));
        }
        if self.languages.languages().is_empty() {
            return Err(RepopulseError::Config("language table has no languages".into()));
        }
        Ok(())
    }

    /// Options for a LOC count.
    pub fn count_options(&self) -> CountOptions {
        CountOptions::new()
            .filter(self.filter.clone())
            .languages(self.languages.clone())
    }
}
