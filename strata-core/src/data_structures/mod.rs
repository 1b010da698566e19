//! Concurrent skip lists and the pieces they share.
//!
//! # Organization
//!
//! - [`skip_list`] - the lazy-locking and the lock-free skip list
//! - [`cursor`] - cursors over level 0 and the [`Entries`] iterator adapter
//! - [`comparator`] - key ordering supplied at construction
//! - [`level_generator`] - random tower heights
//! - `internal` - marked pointers, the shared search descent, retry policy (pub(crate))

pub(crate) mod internal;

pub mod comparator;
pub mod concurrent_skip_list;
pub mod cursor;
pub mod level_generator;
pub mod skip_list;

pub use comparator::{Comparator, OrdComparator, Reverse};
pub use concurrent_skip_list::ConcurrentSkipList;
pub use cursor::{BidirectionalCursor, Entries, SkipCursor};
pub use level_generator::LevelGenerator;
pub use skip_list::{LazyCursor, LazySkipList, LockFreeCursor, LockFreeSkipList, Put};
