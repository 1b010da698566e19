//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! `EpochGuard` is a zero-sized type that schedules destruction on the global epoch
//! collector. A skip list parameterized with it frees unlinked nodes and replaced values
//! once every thread that could still see them has unpinned:
//!
//! ```text
//! LockFreeSkipList<u64, String, EpochGuard>
//!     │
//!     ├── every operation and every cursor pins the current thread
//!     └── retired towers are freed by crossbeam-epoch after the epoch advances
//! ```
//!
//! # Example
//!
//! ```rust
//! use strata_core::LockFreeSkipList;
//! use strata_crossbeam::EpochGuard;
//!
//! let list: LockFreeSkipList<u64, &str, EpochGuard> = LockFreeSkipList::new();
//! list.add(42, "answer");
//!
//! if let Some(value) = list.find(&42) {
//!     assert_eq!(*value, "answer");
//! }
//!
//! assert!(list.delete(&42));
//! ```

use std::fmt;
use std::ops::Deref;

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use strata_core::guard::Guard;

/// Epoch-based memory reclamation guard.
///
/// Unlike `DeferredGuard`, which keeps retired pointers until the list drops, `EpochGuard`
/// holds no state: destruction is handed to the global collector, so memory stays bounded
/// on long-running lists.
///
/// `defer_destroy` pins, schedules the destruction and unpins immediately.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard {}

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard {}
    }
}

/// A value reference that keeps the current thread pinned.
///
/// The value cannot be reclaimed while the `EpochRef` is alive, even if its key is
/// removed or its value is replaced in the meantime.
///
pub struct EpochRef<'a, T> {
    _guard: CrossbeamGuard,
    reference: &'a T,
}

impl<'a, T> EpochRef<'a, T> {
    /// # Safety
    ///
    /// `reference` must stay valid while `guard` is pinned.
    pub(crate) unsafe fn new(guard: CrossbeamGuard, reference: &'a T) -> Self {
        EpochRef {
            _guard: guard,
            reference,
        }
    }

    pub fn get(&self) -> &T {
        self.reference
    }
}

impl<T> Deref for EpochRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.reference
    }
}

impl<T: fmt::Display> fmt::Display for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)
    }
}

impl<T: fmt::Debug> fmt::Debug for EpochRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpochRef({:?})", self.reference)
    }
}

impl Guard for EpochGuard {
    type GuardedRef<'a, T: 'a> = EpochRef<'a, T>;

    /// A pinned crossbeam guard, held for one operation or for a cursor's lifetime.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        // Pinned again so the reference outlives the operation's own pin.
        let guard = epoch::pin();
        unsafe { EpochRef::new(guard, &*ptr) }
    }
}
