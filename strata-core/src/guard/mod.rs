//! Guard trait for memory reclamation strategies.
//!
//! Both skip lists read nodes without taking any lock, so a node that has been unlinked
//! may still be referenced by a concurrent reader. Nodes (and values replaced by a lazy
//! `put`) are therefore never freed directly: they are handed to the list's guard, which
//! frees them once no reader can still hold a reference.
//!
//! ```text
//! LazySkipList<K, V, G: Guard>  /  LockFreeSkipList<K, V, G: Guard>
//!     │
//!     ├── G = EpochGuard      (production, strata-crossbeam)
//!     └── G = DeferredGuard   (testing, frees everything when the list drops)
//! ```

mod deferred_guard;

use std::ops::Deref;

pub use deferred_guard::{DeferredGuard, DeferredRef};

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. Pointers passed to `defer_destroy` are not freed while any `ReadGuard` that was
///    pinned before the call is still alive
/// 2. `GuardedRef` keeps the referenced data valid for its lifetime
///
/// Guards are stored in the lists and must be `Send + Sync`. Pinning happens per
/// operation, not when the guard is created.
///
pub trait Guard: Sized + Default + Send + Sync {
    /// A reference protected by a guard of this type.
    type GuardedRef<'a, T: 'a>: Deref<Target = T>;

    /// An active guard that protects reads for its lifetime.
    ///
    /// Epoch-based guards hold a pinned `crossbeam_epoch::Guard` here. Deferred guards use
    /// `()` since the stored guard already keeps everything alive.
    type ReadGuard: Sized;

    /// Pin an active read guard.
    fn pin() -> Self::ReadGuard;

    /// Schedule a pointer for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `ptr` must be valid and owned by the collection calling this
    /// - `ptr` must no longer be reachable by a fresh traversal
    /// - `dealloc` must be the matching deallocation function
    /// - each pointer must be retired at most once
    ///
    unsafe fn defer_destroy<N>(&self, ptr: *mut N, dealloc: unsafe fn(*mut N));

    /// Create a guarded reference from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to valid data protected by a currently pinned guard
    /// - the data must remain valid for lifetime `'a`
    ///
    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T>;
}

/// Deallocation function for values allocated with `Box::new`.
///
/// # Safety
/// `ptr` must come from `Box::into_raw` and must not be used afterwards.
pub(crate) unsafe fn drop_boxed<T>(ptr: *mut T) {
    unsafe { drop(Box::from_raw(ptr)) };
}
