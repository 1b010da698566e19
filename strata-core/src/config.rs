//! Skip list configuration.
//!
//! Options are plain data so they can be embedded in a larger service configuration and
//! deserialized from TOML or any other serde format:
//!
//! ```toml
//! max_level = 12
//! branching_factor = 2
//!
//! [retry]
//! backoff = "spin"
//! contention_warning_after = 64
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hard upper bound for the height of any tower.
///
/// Search paths are kept in fixed-size arrays of this length.
pub const MAX_LEVEL: usize = 32;

pub(crate) const DEFAULT_MAX_LEVEL: usize = 16;
pub(crate) const DEFAULT_BRANCHING_FACTOR: u32 = 4;
pub(crate) const LOCK_FREE_BRANCHING_FACTOR: u32 = 2;
const DEFAULT_CONTENTION_WARNING_AFTER: u32 = 1024;

/// How a thread waits between two failed attempts of the same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Exponential busy spin.
    Spin,
    /// Exponential busy spin, then yield the time slice to the scheduler.
    #[default]
    SpinThenYield,
}

/// Retry policy applied to failed validations, failed CAS attempts and waits on nodes that
/// are still being linked.
///
/// Retry loops never give up: the policy only shapes how the retries are spaced. Correctness
/// does not depend on it, liveness under heavy contention does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub backoff: BackoffStrategy,
    /// Number of retries of a single operation after which a contention event is logged.
    pub contention_warning_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            backoff: BackoffStrategy::default(),
            contention_warning_after: DEFAULT_CONTENTION_WARNING_AFTER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipListOptions {
    /// Height of the sentinels and upper bound for generated node heights.
    pub max_level: usize,
    /// Each additional level is taken with probability `1 / branching_factor`.
    pub branching_factor: u32,
    pub retry: RetryPolicy,
}

impl Default for SkipListOptions {
    fn default() -> Self {
        SkipListOptions {
            max_level: DEFAULT_MAX_LEVEL,
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            retry: RetryPolicy::default(),
        }
    }
}

impl SkipListOptions {
    /// Coin-flip towers (p = 1/2), the usual choice for the lock-free list.
    pub fn lock_free() -> Self {
        SkipListOptions {
            branching_factor: LOCK_FREE_BRANCHING_FACTOR,
            ..Self::default()
        }
    }

    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_branching_factor(mut self, branching_factor: u32) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 || self.max_level > MAX_LEVEL {
            return Err(Error::InvalidMaxLevel {
                max_level: self.max_level,
                limit: MAX_LEVEL,
            });
        }
        if self.branching_factor < 2 {
            return Err(Error::InvalidBranchingFactor {
                branching_factor: self.branching_factor,
            });
        }
        Ok(())
    }
}
