use std::cmp::Ordering as KeyOrdering;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicIsize, AtomicPtr, Ordering};

use tracing::debug;

use crate::config::SkipListOptions;
use crate::data_structures::comparator::{Comparator, OrdComparator};
use crate::data_structures::concurrent_skip_list::ConcurrentSkipList;
use crate::data_structures::cursor::{Entries, SkipCursor};
use crate::data_structures::internal::tower::{alloc_tower, dealloc_tower, init_links};
use crate::data_structures::internal::{
    MarkedPtr, Position, Retry, SearchNode, Traversal, descend, descend_to_last,
};
use crate::data_structures::level_generator::LevelGenerator;
use crate::error::Result;
use crate::guard::Guard;

type NodePtr<K, V> = *mut LockFreeNode<K, V>;

// =============================================================================
// LOCK-FREE SKIP LIST
// =============================================================================
//
// Every successor slot is a MarkedPtr: (next node, deleted-at-this-level). Redirecting a
// slot and marking it are both a single CAS on the same word, so an insert can never
// link behind a node whose mark is being set.
//
// Membership is decided on level 0 alone. Upper levels are shortcuts.
//
// ADD
// ───
//   1. find; key present → false
//   2. seed every slot of the new node with succs[level]
//   3. CAS preds[0].next[0]: succs[0] → node          (linearization point)
//      failure → back to 1
//   4. for each upper level: store succs[level] into node.next[level] again, then
//      CAS preds[level].next[level]: succs[level] → node; failure → find, retry level
//
//   Step 4 refreshes the node's own slot before every attempt. Linking with a slot
//   seeded by an older find could point the node at a successor that was unlinked in
//   the meantime, pulling it back into the list.
//
// DELETE
// ──────
//   1. find; key absent → false
//   2. the victim must be linked at its top level, otherwise its add is still running:
//      back off and retry
//   3. mark next[top] .. next[1]  (a level already marked stays marked)
//   4. CAS next[0]: (succ, false) → (succ, true)       (linearization point)
//      already marked → another delete won; find again
//   5. the winner unlinks every level with a CAS on the recorded preds; if any CAS
//      fails, one helping find finishes the job
//   6. the winner retires the node through the guard, exactly once
//
// Before:  pred ──────► victim ──────► next
// Mark:    pred ──────► victim ──╳───► next
// Unlink:  pred ─────────────────────► next
//
// Whether a node was already marked is never remembered across attempts: every
// iteration reads the mark bit from the slot.
//
// =============================================================================

/// A tower node: optional entry (sentinels have none) and `height` inline marked links.
#[repr(C)]
struct LockFreeNode<K, V> {
    entry: Option<(K, V)>,
    height: usize,
    // Flexible array: next[0..height] is allocated inline after this struct
    next: [AtomicPtr<LockFreeNode<K, V>>; 0],
}

impl<K, V> LockFreeNode<K, V> {
    fn alloc(entry: Option<(K, V)>, height: usize, link_to: NodePtr<K, V>) -> *mut Self {
        let node = alloc_tower::<Self>(height);
        unsafe {
            ptr::write(&raw mut (*node).entry, entry);
            ptr::write(&raw mut (*node).height, height);
            init_links((&raw mut (*node).next).cast::<AtomicPtr<Self>>(), height, link_to);
        }
        node
    }

    /// # Safety
    /// `node` must come from [`LockFreeNode::alloc`] and be unreachable by any reader.
    unsafe fn dealloc(node: *mut Self) {
        unsafe {
            let height = (*node).height;
            ptr::drop_in_place(&raw mut (*node).entry);
            dealloc_tower(node, height);
        }
    }

    #[inline]
    fn key(&self) -> Option<&K> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    #[inline]
    fn value(&self) -> Option<&V> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    #[inline]
    fn slot(&self, level: usize) -> &AtomicPtr<Self> {
        debug_assert!(level < self.height, "level {} above tower of {}", level, self.height);
        unsafe { &*self.next.as_ptr().add(level) }
    }

    #[inline]
    fn next(&self, level: usize) -> MarkedPtr<Self> {
        MarkedPtr::new(self.slot(level).load(Ordering::Acquire))
    }

    #[inline]
    fn set_next(&self, level: usize, next: MarkedPtr<Self>) {
        self.slot(level).store(next.as_raw(), Ordering::Release)
    }

    #[inline]
    fn cas_next(
        &self,
        level: usize,
        expected: MarkedPtr<Self>,
        new: MarkedPtr<Self>,
    ) -> std::result::Result<(), MarkedPtr<Self>> {
        self.slot(level)
            .compare_exchange(
                expected.as_raw(),
                new.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(MarkedPtr::new)
    }

    /// Logically deleted: the level-0 link carries the mark.
    #[inline]
    fn is_marked(&self) -> bool {
        self.next(0).is_marked()
    }

    /// Set the mark on `level` unless it is already set.
    ///
    /// Returns `true` if this call set it.
    fn mark(&self, level: usize) -> bool {
        let mut succ = self.next(level);
        while !succ.is_marked() {
            match self.cas_next(level, succ, succ.with_mark(true)) {
                Ok(()) => return true,
                Err(actual) => succ = actual,
            }
        }
        false
    }
}

impl<K, V> SearchNode for LockFreeNode<K, V> {
    type Key = K;

    #[inline]
    fn search_key(&self) -> Option<&K> {
        self.key()
    }

    #[inline]
    fn link(&self, level: usize) -> MarkedPtr<Self> {
        self.next(level)
    }

    unsafe fn snip(pred: *mut Self, level: usize, curr: *mut Self, succ: *mut Self) -> bool {
        let expected = MarkedPtr::compose(curr, false);
        let unlinked = MarkedPtr::compose(succ, false);
        unsafe { (*pred).cas_next(level, expected, unlinked).is_ok() }
    }
}

/// A lock-free concurrent ordered map.
///
/// No operation ever waits on a lock. Writers retry failed CAS attempts under the
/// configured [`RetryPolicy`](crate::config::RetryPolicy); traversals unlink logically
/// deleted nodes they run into.
///
/// Entries are immutable once inserted: `add` never replaces a value.
///
/// # Example
///
/// ```rust
/// use strata_core::{DeferredGuard, LockFreeSkipList};
///
/// let list: LockFreeSkipList<u32, u32, DeferredGuard> = LockFreeSkipList::new();
/// assert!(list.add(3, 30));
/// assert!(!list.add(3, 31));
/// assert_eq!(list.get(&3), Some(30));
/// assert!(list.delete(&3));
/// assert!(list.is_empty());
/// ```
pub struct LockFreeSkipList<K, V, G, C = OrdComparator> {
    head: NodePtr<K, V>,
    tail: NodePtr<K, V>,
    // Signed: a losing delete briefly takes back a decrement it made ahead of its mark.
    len: AtomicIsize,
    levels: LevelGenerator,
    options: SkipListOptions,
    comparator: C,
    guard: G,
}

// Safety: nodes are shared only through atomic links. Keys and values are read
// concurrently and cloned or dropped on any thread.
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard, C: Send + Sync> Send
    for LockFreeSkipList<K, V, G, C>
{
}
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard, C: Send + Sync> Sync
    for LockFreeSkipList<K, V, G, C>
{
}

impl<K: Ord, V, G: Guard> LockFreeSkipList<K, V, G> {
    pub fn new() -> Self {
        Self::from_parts(
            SkipListOptions::lock_free(),
            LevelGenerator::coin_flip(),
            OrdComparator,
        )
    }

    pub fn with_options(options: SkipListOptions) -> Result<Self> {
        Self::with_options_and_comparator(options, OrdComparator)
    }
}

impl<K: Ord, V, G: Guard> Default for LockFreeSkipList<K, V, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G: Guard, C: Comparator<K>> LockFreeSkipList<K, V, G, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self::from_parts(
            SkipListOptions::lock_free(),
            LevelGenerator::coin_flip(),
            comparator,
        )
    }

    pub fn with_options_and_comparator(options: SkipListOptions, comparator: C) -> Result<Self> {
        options.validate()?;
        let levels = LevelGenerator::from_options(&options)?;
        Ok(Self::from_parts(options, levels, comparator))
    }

    fn from_parts(options: SkipListOptions, levels: LevelGenerator, comparator: C) -> Self {
        let tail = LockFreeNode::alloc(None, levels.max_level(), ptr::null_mut());
        let head = LockFreeNode::alloc(None, levels.max_level(), tail);

        debug!(
            max_level = levels.max_level(),
            branching_factor = levels.branching_factor(),
            "created lock-free skip list"
        );

        LockFreeSkipList {
            head,
            tail,
            len: AtomicIsize::new(0),
            levels,
            options,
            comparator,
            guard: G::default(),
        }
    }

    pub fn options(&self) -> &SkipListOptions {
        &self.options
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Descent that unlinks marked nodes on its way. The caller must be pinned.
    #[inline]
    fn search(&self, key: &K) -> Position<LockFreeNode<K, V>> {
        self.traverse(key, Traversal::Help)
    }

    #[inline]
    fn traverse(&self, key: &K, traversal: Traversal) -> Position<LockFreeNode<K, V>> {
        unsafe {
            descend(
                self.head,
                self.tail,
                self.levels.max_level(),
                key,
                &self.comparator,
                traversal,
            )
        }
    }

    /// The node holding `key` if it is in the set. Never writes. The caller must be pinned.
    fn live_node(&self, key: &K) -> Option<NodePtr<K, V>> {
        let node = self.traverse(key, Traversal::ReadOnly).found()?;
        (!unsafe { (*node).is_marked() }).then_some(node)
    }

    pub fn contains(&self, key: &K) -> bool {
        let _pin = G::pin();
        self.live_node(key).is_some()
    }

    pub fn find_and_apply<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let _pin = G::pin();
        let node = self.live_node(key)?;
        unsafe { (*node).value() }.map(f)
    }

    /// Guarded reference to the value stored under `key`.
    pub fn find(&self, key: &K) -> Option<G::GuardedRef<'_, V>> {
        let _pin = G::pin();
        let node = self.live_node(key)?;
        let value = unsafe { (*node).value() }?;
        Some(unsafe { G::make_ref(value as *const V) })
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Insert `value` if `key` is absent. Returns whether it was inserted.
    pub fn add(&self, key: K, value: V) -> bool {
        let _pin = G::pin();
        let height = self.levels.random_level();
        let mut retry = Retry::new(self.options.retry, "add");

        let mut position = self.search(&key);
        if position.found_level.is_some() {
            return false;
        }

        let node = LockFreeNode::alloc(Some((key, value)), height, ptr::null_mut());
        let node_ref = unsafe { &*node };
        // SAFETY: allocated just above with an entry.
        let key = unsafe { &node_ref.entry.as_ref().unwrap_unchecked().0 };

        loop {
            for level in 0..height {
                node_ref.set_next(level, MarkedPtr::compose(position.succs[level], false));
            }

            // Counted before any delete can find it.
            self.len.fetch_add(1, Ordering::Relaxed);
            let pred = unsafe { &*position.preds[0] };
            let expected = MarkedPtr::compose(position.succs[0], false);
            if pred.cas_next(0, expected, MarkedPtr::compose(node, false)).is_ok() {
                break;
            }
            self.len.fetch_sub(1, Ordering::Relaxed);

            retry.wait();
            position = self.search(key);
            if position.found_level.is_some() {
                // Never published.
                unsafe { LockFreeNode::dealloc(node) };
                return false;
            }
        }

        for level in 1..height {
            loop {
                let succ = position.succs[level];
                node_ref.set_next(level, MarkedPtr::compose(succ, false));

                let pred = unsafe { &*position.preds[level] };
                let expected = MarkedPtr::compose(succ, false);
                if pred.cas_next(level, expected, MarkedPtr::compose(node, false)).is_ok() {
                    break;
                }
                retry.wait();
                position = self.search(key);
            }
        }

        true
    }

    // =========================================================================
    // Delete
    // =========================================================================

    fn remove_with<R>(&self, key: &K, read: impl FnOnce(&V) -> R) -> Option<R> {
        let _pin = G::pin();
        let mut retry = Retry::new(self.options.retry, "delete");

        loop {
            let position = self.search(key);
            let found_level = position.found_level?;
            let victim = position.succs[found_level];
            let victim_ref = unsafe { &*victim };

            if found_level + 1 != victim_ref.height {
                // Its add has not reached the top level yet.
                retry.wait();
                continue;
            }

            for level in (1..victim_ref.height).rev() {
                victim_ref.mark(level);
            }
            // Counted out before the mark makes the key look absent to a racing add.
            self.len.fetch_sub(1, Ordering::Relaxed);
            if !victim_ref.mark(0) {
                // Another delete owns it; the next find no longer sees it.
                self.len.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let result = victim_ref.value().map(read);

            self.unlink(victim, &position, key);
            unsafe { self.guard.defer_destroy(victim, LockFreeNode::dealloc) };
            return result;
        }
    }

    /// Physically remove a fully marked node from every level.
    fn unlink(&self, victim: NodePtr<K, V>, position: &Position<LockFreeNode<K, V>>, key: &K) {
        let victim_ref = unsafe { &*victim };
        let mut complete = true;

        for level in (0..victim_ref.height).rev() {
            let pred = unsafe { &*position.preds[level] };
            let succ = victim_ref.next(level).as_ptr();
            let unlinked = pred.cas_next(
                level,
                MarkedPtr::compose(victim, false),
                MarkedPtr::compose(succ, false),
            );
            complete &= unlinked.is_ok();
        }

        if !complete {
            // Someone changed a predecessor. A helping descent snips every marked node
            // in front of the key, the victim included.
            self.search(key);
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.remove_with(key, V::clone)
    }

    /// Remove `key`. Returns whether this call removed it.
    pub fn delete(&self, key: &K) -> bool {
        self.remove_with(key, |_| ()).is_some()
    }

    // =========================================================================
    // Cursors
    // =========================================================================

    /// Cursor at the first node whose key is at least `bound`, or at the first node.
    pub fn begin(&self, bound: Option<&K>) -> LockFreeCursor<'_, K, V, G, C> {
        let pin = G::pin();
        let node = match bound {
            Some(key) => self.traverse(key, Traversal::ReadOnly).succs[0],
            None => unsafe { (*self.head).next(0).as_ptr() },
        };
        LockFreeCursor {
            list: self,
            node,
            _pin: pin,
        }
    }

    /// Cursor at the last node whose key is at most `bound`, or at the last node.
    pub fn end(&self, bound: Option<&K>) -> LockFreeCursor<'_, K, V, G, C> {
        let pin = G::pin();
        let node = match bound {
            Some(key) => {
                let position = self.traverse(key, Traversal::ReadOnly);
                position.found().unwrap_or(position.preds[0])
            }
            None => unsafe { descend_to_last(self.head, self.tail, self.levels.max_level()) },
        };
        LockFreeCursor {
            list: self,
            node,
            _pin: pin,
        }
    }

    /// Iterator over live entries in key order.
    pub fn iter(&self) -> Entries<LockFreeCursor<'_, K, V, G, C>> {
        let pin = G::pin();
        Entries::new(LockFreeCursor {
            list: self,
            node: self.head,
            _pin: pin,
        })
    }
}

impl<K: Clone, V: Clone, G: Guard, C: Comparator<K>> LockFreeSkipList<K, V, G, C> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.find_and_apply(key, V::clone)
    }

    /// Live entries in key order. Not a snapshot under concurrent writes.
    pub fn to_vec(&self) -> Vec<(K, V)> {
        self.iter().collect()
    }

    /// Smallest live entry with a key greater than or equal to `key`.
    pub fn ceiling(&self, key: &K) -> Option<(K, V)> {
        let _pin = G::pin();
        let mut node = self.traverse(key, Traversal::ReadOnly).succs[0];
        while node != self.tail {
            let node_ref = unsafe { &*node };
            let next = node_ref.next(0);
            if !next.is_marked() {
                return node_ref.entry.clone();
            }
            node = next.as_ptr();
        }
        None
    }

    /// Largest live entry with a key less than or equal to `key`.
    pub fn floor(&self, key: &K) -> Option<(K, V)> {
        let _pin = G::pin();
        let mut retry = Retry::new(self.options.retry, "floor");

        loop {
            let position = self.traverse(key, Traversal::ReadOnly);
            let candidate = position.found().unwrap_or(position.preds[0]);
            if candidate == self.head {
                return None;
            }

            let candidate_ref = unsafe { &*candidate };
            if !candidate_ref.is_marked() {
                return candidate_ref.entry.clone();
            }
            // Deleted after the descent passed it; look again.
            retry.wait();
        }
    }
}

impl<K, V, G, C> ConcurrentSkipList<K, V> for LockFreeSkipList<K, V, G, C>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
    G: Guard,
    C: Comparator<K>,
{
    type Cursor<'a>
        = LockFreeCursor<'a, K, V, G, C>
    where
        Self: 'a;

    fn insert(&self, key: K, value: V) -> bool {
        self.add(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        LockFreeSkipList::remove(self, key)
    }

    fn delete(&self, key: &K) -> bool {
        LockFreeSkipList::delete(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        LockFreeSkipList::contains(self, key)
    }

    fn get(&self, key: &K) -> Option<V> {
        LockFreeSkipList::get(self, key)
    }

    fn len(&self) -> usize {
        LockFreeSkipList::len(self)
    }

    fn to_vec(&self) -> Vec<(K, V)> {
        LockFreeSkipList::to_vec(self)
    }

    fn begin(&self, bound: Option<&K>) -> Self::Cursor<'_> {
        LockFreeSkipList::begin(self, bound)
    }
}

/// Level-0 dump: `[h] > [3] > [6(2)]* > [t]`, tower heights above one in parentheses,
/// marked nodes starred.
impl<K: fmt::Debug, V, G: Guard, C> fmt::Debug for LockFreeSkipList<K, V, G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _pin = G::pin();
        write!(f, "[h]")?;

        let mut node = unsafe { (*self.head).next(0).as_ptr() };
        while node != self.tail {
            let node_ref = unsafe { &*node };
            let next = node_ref.next(0);
            if let Some(key) = node_ref.key() {
                if node_ref.height > 1 {
                    write!(f, " > [{:?}({})]", key, node_ref.height)?;
                } else {
                    write!(f, " > [{:?}]", key)?;
                }
                if next.is_marked() {
                    write!(f, "*")?;
                }
            }
            node = next.as_ptr();
        }

        write!(f, " > [t]")
    }
}

impl<K, V, G, C> Drop for LockFreeSkipList<K, V, G, C> {
    fn drop(&mut self) {
        // Deletes unlink before returning, so level 0 holds only live nodes here.
        let mut node = self.head;
        while !node.is_null() {
            let next = if node == self.tail {
                MarkedPtr::new(ptr::null_mut())
            } else {
                unsafe { (*node).next(0) }
            };
            debug_assert!(!next.is_marked(), "marked node still linked on drop");
            unsafe { LockFreeNode::dealloc(node) };
            node = next.as_ptr();
        }
    }
}

// ============================================================================
// LockFreeCursor
// ============================================================================

/// Forward-only cursor over a [`LockFreeSkipList`].
///
/// Holds a pinned read guard for its whole lifetime.
pub struct LockFreeCursor<'a, K, V, G: Guard, C> {
    list: &'a LockFreeSkipList<K, V, G, C>,
    node: NodePtr<K, V>,
    _pin: G::ReadGuard,
}

impl<K, V, G: Guard, C: Comparator<K>> SkipCursor for LockFreeCursor<'_, K, V, G, C> {
    type Key = K;
    type Value = V;

    fn is_present(&self) -> bool {
        self.node != self.list.head && self.node != self.list.tail
    }

    fn move_next(&mut self) -> bool {
        if self.node == self.list.tail {
            return false;
        }
        self.node = unsafe { (*self.node).next(0).as_ptr() };
        true
    }

    fn is_marked(&self) -> bool {
        self.is_present() && unsafe { (*self.node).is_marked() }
    }

    fn key(&self) -> Option<&K> {
        if !self.is_present() {
            return None;
        }
        unsafe { (*self.node).key() }
    }

    fn value(&self) -> Option<&V> {
        if !self.is_present() {
            return None;
        }
        unsafe { (*self.node).value() }
    }

    fn compare_to(&self, key: &K) -> KeyOrdering {
        if self.node == self.list.head {
            return KeyOrdering::Less;
        }
        match self.key() {
            Some(node_key) => self.list.comparator.compare(node_key, key),
            None => KeyOrdering::Greater,
        }
    }
}
