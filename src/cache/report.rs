//! Side channel for cache failures that must not fail the caller

use crate::error::CacheError;
use std::sync::Mutex;
use tracing::warn;

/// Receives errors the cache swallows, such as failed cache writes
pub trait CacheErrorReporter: Send + Sync {
    fn report(&self, error: &CacheError);
}

/// Logs reported errors at `warn` level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CacheErrorReporter for TracingReporter {
    fn report(&self, error: &CacheError) {
        warn!("Module cache population failed: {}", error);
    }
}

/// Keeps reported errors in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of every reported error, oldest first
    pub fn reports(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.reports().is_empty()
    }
}

impl CacheErrorReporter for CollectingReporter {
    fn report(&self, error: &CacheError) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(error.to_string());
    }
}
