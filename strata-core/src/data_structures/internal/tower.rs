use std::alloc::{Layout, alloc, dealloc};
use std::ptr;
use std::sync::atomic::AtomicPtr;

/// Layout of a node header `N` followed inline by `height` successor slots.
///
/// Node structs end in a zero-length `[AtomicPtr<N>; 0]` field, so the slots start right
/// where that field sits: one allocation per node, no separate tower vector.
pub(crate) fn tower_layout<N>(height: usize) -> Layout {
    let Ok(links) = Layout::array::<AtomicPtr<N>>(height) else {
        unreachable!("tower height {} is bounded by MAX_LEVEL", height);
    };
    let Ok((layout, _)) = Layout::new::<N>().extend(links) else {
        unreachable!("tower height {} is bounded by MAX_LEVEL", height);
    };
    layout.pad_to_align()
}

/// Allocate uninitialized memory for a node of the given height.
pub(crate) fn alloc_tower<N>(height: usize) -> *mut N {
    let layout = tower_layout::<N>(height);
    let node = unsafe { alloc(layout) } as *mut N;
    if node.is_null() {
        std::alloc::handle_alloc_error(layout);
    }
    node
}

/// Point every slot of a freshly allocated tower at `target`.
///
/// # Safety
/// `slots` must point to `height` writable, uninitialized slots.
pub(crate) unsafe fn init_links<N>(slots: *mut AtomicPtr<N>, height: usize, target: *mut N) {
    for level in 0..height {
        unsafe { ptr::write(slots.add(level), AtomicPtr::new(target)) };
    }
}

/// Release the memory of a node whose fields have already been dropped.
///
/// # Safety
/// `node` must come from [`alloc_tower`] with the same `height`.
pub(crate) unsafe fn dealloc_tower<N>(node: *mut N, height: usize) {
    unsafe { dealloc(node as *mut u8, tower_layout::<N>(height)) };
}
