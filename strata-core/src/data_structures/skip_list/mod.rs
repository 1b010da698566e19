//! Concurrent skip lists.
//!
//! Two synchronization strategies over the same skeleton (sentinels, towers, search):
//!
//! - [`LazySkipList`] - per-node mutexes taken only around the splice, optimistic
//!   validation, lock-free reads, bidirectional cursor.
//! - [`LockFreeSkipList`] - CAS on marked successor links, helping traversals,
//!   forward-only cursor.

mod lazy;
mod lock_free;

pub use lazy::{LazyCursor, LazySkipList};
pub use lock_free::{LockFreeCursor, LockFreeSkipList};

/// Outcome of a lazy `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put<V> {
    /// Value that was replaced, `None` when the key was newly inserted.
    pub previous: Option<V>,
    /// Value now stored under the key.
    pub current: V,
}

impl<V> Put<V> {
    pub fn replaced(&self) -> bool {
        self.previous.is_some()
    }
}
