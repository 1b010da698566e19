//! Deferred guard implementation for testing.

#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::{Mutex, PoisonError};

use super::Guard;

/// A guard that keeps every retired pointer alive until the guard itself is dropped.
///
/// Destruction timing is fully predictable, which makes it the guard of choice for tests:
/// a node removed while a cursor still points at it stays readable until the list goes
/// away. Memory accumulates for the lifetime of the list, so long-running code should use
/// the epoch-based guard instead.
///
/// Retiring the same pointer twice is a bug in the calling list; debug builds panic on it.
///
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the pointer is only dereferenced by the dealloc function, once, on drop.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of pointers waiting for destruction.
    pub fn pending(&self) -> usize {
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = self
            .deferred
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

/// Reference handed out under a `DeferredGuard`.
///
/// Nothing is freed before the list drops, so the borrow alone keeps the data valid.
///
pub struct DeferredRef<'a, T> {
    data: &'a T,
}

impl<'a, T> DeferredRef<'a, T> {
    pub fn new(data: &'a T) -> Self {
        DeferredRef { data }
    }
}

impl<T> Deref for DeferredRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DeferredRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredRef({:?})", self.data)
    }
}

impl Guard for DeferredGuard {
    type GuardedRef<'a, T: 'a> = DeferredRef<'a, T>;

    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, ptr: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let addr = ptr as usize;
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            if !seen.insert(addr) {
                panic!("pointer {:#x} retired twice", addr);
            }
        }

        let node = DeferredNode {
            ptr: ptr as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(node);
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        DeferredRef::new(unsafe { &*ptr })
    }
}
