//! # Pool configuration.
//!
//! Provides [`Config`], the settings shared by the supervisor and the worker agent.
//! Defaults are merged with caller overrides through struct-update syntax:
//!
//! ```rust
//! use procvisor::Config;
//!
//! let cfg = Config { respawn: true, threads_per_core: 2, ..Config::default() };
//! assert_eq!(cfg.threads_per_core_clamped(), 2);
//! ```
//!
//! ## Sentinel values
//! - `threads_per_core = 0` → treated as `1`
//! - `cpus = None` → discovered via `std::thread::available_parallelism`
//! - `cpus = Some(0)` → treated as `1`
//! - `respawn_backoff = None` → respawn on the next loop turn

use std::num::NonZeroUsize;

use crate::policies::BackoffPolicy;

/// Configuration for a procvisor pool.
///
/// ## Field semantics
/// - `respawn`: replace workers that exit abnormally (non-zero code or signal)
/// - `threads_per_core`: multiplier used by `each_thread` (min 1)
/// - `cpus`: override for the CPU count used by `each_cpu` / `each_thread`
/// - `respawn_backoff`: optional delay between a crash and its replacement
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Automatically replace workers that exit abnormally.
    ///
    /// When `false`, an abnormal exit counts toward the done condition exactly
    /// like a normal completion.
    pub respawn: bool,

    /// Number of worker threads per core used by `each_thread`.
    pub threads_per_core: usize,

    /// CPU count override. `None` asks the OS.
    pub cpus: Option<usize>,

    /// Delay policy applied between an abnormal exit and the replacement spawn.
    ///
    /// The attempt number fed to [`BackoffPolicy::next`] is the slot's crash
    /// count minus one, so the first crash uses `first`.
    pub respawn_backoff: Option<BackoffPolicy>,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns `threads_per_core` coerced to at least 1.
    #[inline]
    pub fn threads_per_core_clamped(&self) -> usize {
        self.threads_per_core.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the CPU count: the override if set, otherwise the OS value.
    ///
    /// Never returns 0.
    pub fn cpus(&self) -> usize {
        match self.cpus {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    /// Returns `cpus() * threads_per_core_clamped()`.
    pub fn threads(&self) -> usize {
        self.cpus().saturating_mul(self.threads_per_core_clamped())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `respawn = false`
    /// - `threads_per_core = 1`
    /// - `cpus = None` (ask the OS)
    /// - `respawn_backoff = None` (next loop turn)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            respawn: false,
            threads_per_core: 1,
            cpus: None,
            respawn_backoff: None,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(!cfg.respawn);
        assert_eq!(cfg.threads_per_core, 1);
        assert!(cfg.respawn_backoff.is_none());
        assert!(cfg.cpus() >= 1);
    }

    #[test]
    fn test_zero_sentinels_are_coerced() {
        let cfg = Config {
            threads_per_core: 0,
            cpus: Some(0),
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.threads_per_core_clamped(), 1);
        assert_eq!(cfg.cpus(), 1);
        assert_eq!(cfg.threads(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_threads_multiplies_cpus() {
        let cfg = Config {
            cpus: Some(4),
            threads_per_core: 2,
            ..Config::default()
        };
        assert_eq!(cfg.threads(), 8);
    }
}
