// Marked pointer: a successor reference and a deletion flag packed into one word.
//
// Bit layout:
//   Bit 0: DELETE_MARK - the node owning this slot is logically deleted at this level
//
// Nodes are at least word aligned, so bit 0 of a real node address is always zero and
// the pair (successor, mark) can be read, written and compared-and-swapped as a single
// `AtomicPtr`. Keeping both halves in one word is what prevents an insert from linking
// behind a node whose deletion mark is being set concurrently.
//
const DELETE_MARK: usize = 0b1;

/// A pointer that uses the least significant bit as the deletion mark.
pub(crate) struct MarkedPtr<T> {
    ptr: *mut T,
}

// Manual impls to avoid requiring T: Clone/Copy
impl<T> Copy for MarkedPtr<T> {}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for MarkedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for MarkedPtr<T> {}

impl<T> std::fmt::Debug for MarkedPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkedPtr")
            .field("ptr", &self.as_ptr())
            .field("marked", &self.is_marked())
            .finish()
    }
}

impl<T> MarkedPtr<T> {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Wrap a raw (possibly marked) pointer loaded from a slot.
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        MarkedPtr { ptr }
    }

    /// Build the pair `(ptr, marked)`.
    #[inline]
    pub(crate) fn compose(ptr: *mut T, marked: bool) -> Self {
        MarkedPtr::new(ptr).with_mark(marked)
    }

    /// Strip the mark bit from a raw pointer without creating a MarkedPtr instance.
    #[inline]
    pub(crate) fn unmask(ptr: *mut T) -> *mut T {
        (ptr as usize & !DELETE_MARK) as *mut T
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// The clean pointer, safe to dereference.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        Self::unmask(self.ptr)
    }

    /// The raw word with the mark bit intact, as stored in the slot.
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        (self.ptr as usize & DELETE_MARK) != 0
    }

    #[inline]
    pub(crate) fn with_mark(&self, mark: bool) -> Self {
        let ptr_bits = self.as_ptr() as usize;
        let marked_bits = if mark {
            ptr_bits | DELETE_MARK
        } else {
            ptr_bits
        };
        MarkedPtr {
            ptr: marked_bits as *mut T,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_round_trip() {
        let mut value = 17u64;
        let raw: *mut u64 = &mut value;

        let clean = MarkedPtr::new(raw);
        assert!(!clean.is_marked());
        assert_eq!(clean.as_ptr(), raw);

        let marked = clean.with_mark(true);
        assert!(marked.is_marked());
        assert_eq!(marked.as_ptr(), raw);
        assert_ne!(marked.as_raw(), raw);
        assert_eq!(MarkedPtr::unmask(marked.as_raw()), raw);

        assert_eq!(marked.with_mark(false), clean);
        assert_eq!(MarkedPtr::compose(raw, true), marked);
    }

    #[test]
    fn test_null_can_be_marked() {
        let marked = MarkedPtr::<u64>::compose(std::ptr::null_mut(), true);
        assert!(marked.is_marked());
        assert!(marked.as_ptr().is_null());
    }
}
