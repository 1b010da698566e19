//! Construction-time errors.
//!
//! Missing keys and duplicate inserts are ordinary `bool` / `Option` outcomes of the list
//! operations. Failed validations and failed CAS attempts are retried internally and never
//! reach the caller. The only errors left are bad configuration values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("max_level must be in 1..={limit}, got {max_level}")]
    InvalidMaxLevel { max_level: usize, limit: usize },

    #[error("branching_factor must be at least 2, got {branching_factor}")]
    InvalidBranchingFactor { branching_factor: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
