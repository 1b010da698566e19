use crate::config::{
    DEFAULT_BRANCHING_FACTOR, DEFAULT_MAX_LEVEL, LOCK_FREE_BRANCHING_FACTOR, MAX_LEVEL,
    SkipListOptions,
};
use crate::error::{Error, Result};

/// Picks tower heights from a geometric distribution.
///
/// Height 1 is always taken; every further level is added with probability
/// `1 / branching_factor` until `max_level` is reached. Calls are independent and need no
/// coordination: randomness comes from the thread-local `fastrand` generator.
///
#[derive(Debug, Clone, Copy)]
pub struct LevelGenerator {
    max_level: usize,
    branching_factor: u32,
}

impl LevelGenerator {
    pub fn new(max_level: usize, branching_factor: u32) -> Result<Self> {
        if max_level == 0 || max_level > MAX_LEVEL {
            return Err(Error::InvalidMaxLevel {
                max_level,
                limit: MAX_LEVEL,
            });
        }
        if branching_factor < 2 {
            return Err(Error::InvalidBranchingFactor { branching_factor });
        }
        Ok(LevelGenerator {
            max_level,
            branching_factor,
        })
    }

    pub fn from_options(options: &SkipListOptions) -> Result<Self> {
        Self::new(options.max_level, options.branching_factor)
    }

    /// Coin-flip towers at the default height, matching `SkipListOptions::lock_free()`.
    pub fn coin_flip() -> Self {
        LevelGenerator {
            max_level: DEFAULT_MAX_LEVEL,
            branching_factor: LOCK_FREE_BRANCHING_FACTOR,
        }
    }

    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    #[inline]
    pub fn branching_factor(&self) -> u32 {
        self.branching_factor
    }

    /// Generate a random height in `1..=max_level`.
    #[inline]
    pub fn random_level(&self) -> usize {
        if self.branching_factor == 2 {
            // One draw instead of a loop: each trailing one bit is a successful coin flip.
            let random_bits = fastrand::u32(..);
            let extra_levels = (!random_bits).trailing_zeros() as usize;
            return (1 + extra_levels).min(self.max_level);
        }

        let mut level = 1;
        while level < self.max_level && fastrand::u32(..self.branching_factor) == 0 {
            level += 1;
        }
        level
    }
}

/// Matches `SkipListOptions::default()`.
impl Default for LevelGenerator {
    fn default() -> Self {
        LevelGenerator {
            max_level: DEFAULT_MAX_LEVEL,
            branching_factor: DEFAULT_BRANCHING_FACTOR,
        }
    }
}
