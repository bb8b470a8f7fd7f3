//! Configuration for workspace update execution
//!
//! This module provides configuration types for controlling how the updater
//! schedules component updates, including concurrency settings and thread pool
//! management.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Components are updated one after another on the updater thread
    Sequential,
    /// Component update parts are fanned out to a thread pool and joined with a latch
    #[default]
    Parallel,
}

/// Configuration for the workspace updater
///
/// Changes to the thread pool size only take effect between iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// The concurrency mode to use for component updates
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the component update thread pool
    /// Defaults to the available parallelism when unset
    pub thread_pool_size: Option<usize>,
    /// Pause at the start of every iteration
    pub update_delay: Duration,
    /// Log a warning each time a latch wait exceeds this duration
    pub latch_diagnostic_timeout: Option<Duration>,
}

impl UpdaterConfig {
    /// Create a new updater configuration with default values
    ///
    /// Default configuration uses Parallel mode sized to the machine
    pub fn new() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
            update_delay: Duration::ZERO,
            latch_diagnostic_timeout: None,
        }
    }

    /// Set the concurrency mode for component updates
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Parallel
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    pub fn with_latch_diagnostic_timeout(mut self, timeout: Duration) -> Self {
        self.latch_diagnostic_timeout = Some(timeout);
        self
    }

    /// Number of worker threads actually used
    pub fn effective_threads(&self) -> usize {
        self.thread_pool_size
            .unwrap_or_else(available_threads)
            .max(1)
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Available parallelism, falling back to one thread
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Parallel);
        assert_eq!(config.thread_pool_size, None);
        assert_eq!(config.update_delay, Duration::ZERO);
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = UpdaterConfig::new()
            .with_concurrency(ConcurrencyMode::Sequential)
            .with_thread_pool_size(4)
            .with_update_delay(Duration::from_millis(5));

        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, Some(4));
        assert_eq!(config.effective_threads(), 4);
        assert_eq!(config.update_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_zero_threads_clamped() {
        let config = UpdaterConfig::new().with_thread_pool_size(0);
        assert_eq!(config.effective_threads(), 1);
    }

    #[test]
    fn test_config_serializes() {
        let config = UpdaterConfig::new().with_thread_pool_size(2);
        let json = serde_json::to_string(&config).unwrap();
        let restored: UpdaterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
