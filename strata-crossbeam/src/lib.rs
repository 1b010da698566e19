//! Crossbeam-based memory reclamation for strata skip lists.
//!
//! This crate provides `EpochGuard`, an implementation of the `Guard` trait backed by
//! crossbeam-epoch, and the aliases most callers want.
//!
//! # Usage
//!
//! ```rust
//! use strata_crossbeam::LazySkipMap;
//!
//! let map: LazySkipMap<&str, u64> = LazySkipMap::new();
//! map.put("requests", 1);
//! map.put_with("requests", 1, |count| count + 1);
//! assert_eq!(map.get(&"requests"), Some(2));
//! ```

pub mod epoch_guard;

use strata_core::{LazySkipList, LockFreeSkipList, OrdComparator};

pub use epoch_guard::{EpochGuard, EpochRef};

/// Lazy-locking skip list with epoch-based reclamation.
pub type LazySkipMap<K, V, C = OrdComparator> = LazySkipList<K, V, EpochGuard, C>;

/// Lock-free skip list with epoch-based reclamation.
pub type LockFreeSkipMap<K, V, C = OrdComparator> = LockFreeSkipList<K, V, EpochGuard, C>;
