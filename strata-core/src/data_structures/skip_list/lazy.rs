use std::cmp::Ordering as KeyOrdering;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::SkipListOptions;
use crate::data_structures::comparator::{Comparator, OrdComparator};
use crate::data_structures::concurrent_skip_list::ConcurrentSkipList;
use crate::data_structures::cursor::{BidirectionalCursor, Entries, SkipCursor};
use crate::data_structures::internal::tower::{alloc_tower, dealloc_tower, init_links};
use crate::data_structures::internal::{
    MarkedPtr, Position, Retry, SearchNode, Traversal, descend,
};
use crate::data_structures::level_generator::LevelGenerator;
use crate::data_structures::skip_list::Put;
use crate::error::Result;
use crate::guard::{Guard, drop_boxed};

type LazyNodePtr<K, V> = *mut LazyNode<K, V>;

// =============================================================================
// LAZY SKIP LIST
// =============================================================================
//
// Readers never lock. Writers find the position without locks, lock only the nodes
// they are about to change, and validate that nothing moved in between:
//
//   find ──► lock preds (level 0 upwards) ──► validate ──► splice ──► unlock
//                          │                     │
//                          └──── failed ◄────────┘  release everything, find again
//
// Node states:
//
//   allocated ──► spliced, fully_linked = false ──► fully_linked = true
//             ──► marked = true (logically deleted) ──► unlinked at every level
//
// A node is in the set while it is fully linked and not marked.
//
// LOCK ORDER: a thread takes locks in strictly decreasing key order. Remove locks its
// victim first, then the predecessors from level 0 upwards; both inserts and removes
// walk the predecessors from level 0 upwards, and preds[level + 1] never lies to the
// right of preds[level]. A predecessor shared by consecutive levels is locked once.
//
// BACK LINKS: level 0 is doubly linked for the reverse cursor. A node's `prev` is only
// written while holding the lock of its level-0 predecessor.
//
// VALUES: each node owns a boxed value behind an AtomicPtr. Put swaps the box under the
// node lock after re-checking `marked`, so it is atomic with respect to Remove and other
// Puts on the same key. The old box is retired through the guard.
//
// =============================================================================

/// A tower node with a key, a boxed value and `height` inline successor slots.
///
/// Sentinels carry neither key nor value.
#[repr(C)]
struct LazyNode<K, V> {
    key: Option<K>,
    value: AtomicPtr<V>,
    lock: Mutex<()>,
    marked: AtomicBool,
    fully_linked: AtomicBool,
    prev: AtomicPtr<LazyNode<K, V>>,
    height: usize,
    // Flexible array: next[0..height] is allocated inline after this struct
    next: [AtomicPtr<LazyNode<K, V>>; 0],
}

impl<K, V> LazyNode<K, V> {
    fn alloc(
        key: Option<K>,
        value: *mut V,
        height: usize,
        link_to: LazyNodePtr<K, V>,
    ) -> *mut Self {
        let node = alloc_tower::<Self>(height);
        unsafe {
            ptr::write(&raw mut (*node).key, key);
            ptr::write(&raw mut (*node).value, AtomicPtr::new(value));
            ptr::write(&raw mut (*node).lock, Mutex::new(()));
            ptr::write(&raw mut (*node).marked, AtomicBool::new(false));
            ptr::write(&raw mut (*node).fully_linked, AtomicBool::new(false));
            ptr::write(&raw mut (*node).prev, AtomicPtr::new(ptr::null_mut()));
            ptr::write(&raw mut (*node).height, height);
            init_links((&raw mut (*node).next).cast::<AtomicPtr<Self>>(), height, link_to);
        }
        node
    }

    fn with_entry(key: K, value: V, height: usize) -> *mut Self {
        let value = Box::into_raw(Box::new(value));
        Self::alloc(Some(key), value, height, ptr::null_mut())
    }

    fn sentinel(height: usize, link_to: LazyNodePtr<K, V>) -> *mut Self {
        let node = Self::alloc(None, ptr::null_mut(), height, link_to);
        unsafe { (*node).fully_linked.store(true, Ordering::Relaxed) };
        node
    }

    /// # Safety
    /// `node` must come from [`LazyNode::alloc`] and be unreachable by any reader.
    unsafe fn dealloc(node: *mut Self) {
        unsafe {
            let height = (*node).height;
            let value = (*node).value.load(Ordering::Relaxed);
            if !value.is_null() {
                drop(Box::from_raw(value));
            }
            ptr::drop_in_place(&raw mut (*node).key);
            ptr::drop_in_place(&raw mut (*node).lock);
            dealloc_tower(node, height);
        }
    }

    #[inline]
    fn slot(&self, level: usize) -> &AtomicPtr<Self> {
        debug_assert!(level < self.height, "level {} above tower of {}", level, self.height);
        unsafe { &*self.next.as_ptr().add(level) }
    }

    #[inline]
    fn next(&self, level: usize) -> LazyNodePtr<K, V> {
        self.slot(level).load(Ordering::Acquire)
    }

    #[inline]
    fn set_next(&self, level: usize, node: LazyNodePtr<K, V>) {
        self.slot(level).store(node, Ordering::Release)
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    #[inline]
    fn is_fully_linked(&self) -> bool {
        self.fully_linked.load(Ordering::Acquire)
    }

    #[inline]
    fn is_live(&self) -> bool {
        self.is_fully_linked() && !self.is_marked()
    }

    #[inline]
    fn value_ptr(&self) -> *mut V {
        self.value.load(Ordering::Acquire)
    }

    /// # Safety
    /// The caller must hold a pinned guard; the box may be replaced and retired at any time.
    #[inline]
    unsafe fn value(&self) -> Option<&V> {
        unsafe { self.value_ptr().as_ref() }
    }
}

impl<K, V> SearchNode for LazyNode<K, V> {
    type Key = K;

    #[inline]
    fn search_key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    #[inline]
    fn link(&self, level: usize) -> MarkedPtr<Self> {
        MarkedPtr::new(self.next(level))
    }

    // Lazy links never carry a mark: deletion state lives in `marked`.
    unsafe fn snip(_pred: *mut Self, _level: usize, _curr: *mut Self, _succ: *mut Self) -> bool {
        true
    }
}

/// What an insert does when the key is already present.
enum Existing<F> {
    Keep,
    Update(F),
}

enum Upserted<V> {
    Inserted,
    Present,
    Replaced { previous: V, current: V },
}

/// A concurrent ordered map using lazy fine-grained locking.
///
/// Lookups and cursors never take a lock. `put` and `remove` lock only the predecessors
/// they splice, validating them first. The element count is kept in an atomic counter.
///
/// # Example
///
/// ```rust
/// use strata_core::{DeferredGuard, LazySkipList};
///
/// let list: LazySkipList<u32, &str, DeferredGuard> = LazySkipList::new();
/// list.put(2, "two");
/// list.put(1, "one");
/// assert_eq!(list.put(2, "deux").previous, Some("two"));
///
/// assert_eq!(list.get(&2), Some("deux"));
/// assert_eq!(list.to_vec(), vec![(1, "one"), (2, "deux")]);
/// ```
pub struct LazySkipList<K, V, G, C = OrdComparator> {
    head: LazyNodePtr<K, V>,
    tail: LazyNodePtr<K, V>,
    len: AtomicUsize,
    levels: LevelGenerator,
    options: SkipListOptions,
    comparator: C,
    guard: G,
}

// Safety: nodes are shared between threads only through atomics and per-node mutexes.
// Keys and values are read concurrently and moved across threads on removal.
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard, C: Send + Sync> Send
    for LazySkipList<K, V, G, C>
{
}
unsafe impl<K: Send + Sync, V: Send + Sync, G: Guard, C: Send + Sync> Sync
    for LazySkipList<K, V, G, C>
{
}

impl<K: Ord, V, G: Guard> LazySkipList<K, V, G> {
    pub fn new() -> Self {
        Self::from_parts(SkipListOptions::default(), LevelGenerator::default(), OrdComparator)
    }

    pub fn with_options(options: SkipListOptions) -> Result<Self> {
        Self::with_options_and_comparator(options, OrdComparator)
    }
}

impl<K: Ord, V, G: Guard> Default for LazySkipList<K, V, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G: Guard, C: Comparator<K>> LazySkipList<K, V, G, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self::from_parts(SkipListOptions::default(), LevelGenerator::default(), comparator)
    }

    pub fn with_options_and_comparator(options: SkipListOptions, comparator: C) -> Result<Self> {
        options.validate()?;
        let levels = LevelGenerator::from_options(&options)?;
        Ok(Self::from_parts(options, levels, comparator))
    }

    fn from_parts(options: SkipListOptions, levels: LevelGenerator, comparator: C) -> Self {
        let tail = LazyNode::sentinel(levels.max_level(), ptr::null_mut());
        let head = LazyNode::sentinel(levels.max_level(), tail);
        unsafe { (*tail).prev.store(head, Ordering::Relaxed) };

        debug!(
            max_level = levels.max_level(),
            branching_factor = levels.branching_factor(),
            "created lazy skip list"
        );

        LazySkipList {
            head,
            tail,
            len: AtomicUsize::new(0),
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
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Lock-free descent. The caller must be pinned.
    #[inline]
    fn search(&self, key: &K) -> Position<LazyNode<K, V>> {
        unsafe {
            descend(
                self.head,
                self.tail,
                self.levels.max_level(),
                key,
                &self.comparator,
                Traversal::ReadOnly,
            )
        }
    }

    /// The node holding `key` if it is in the set. The caller must be pinned.
    fn live_node(&self, key: &K) -> Option<LazyNodePtr<K, V>> {
        let node = self.search(key).found()?;
        unsafe { (*node).is_live() }.then_some(node)
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
    ///
    /// The reference stays valid even if the entry is replaced or removed meanwhile.
    pub fn find(&self, key: &K) -> Option<G::GuardedRef<'_, V>> {
        let _pin = G::pin();
        let node = self.live_node(key)?;
        Some(unsafe { G::make_ref((*node).value_ptr()) })
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Lock the distinct predecessors of levels `0..height` and validate each one is
    /// unmarked and still points at `expected(level)`.
    ///
    /// With `live_successor`, the expected successors must be unmarked too.
    fn lock_predecessors(
        &self,
        position: &Position<LazyNode<K, V>>,
        height: usize,
        expected: impl Fn(usize) -> LazyNodePtr<K, V>,
        live_successor: bool,
    ) -> Option<Vec<MutexGuard<'_, ()>>> {
        let mut locks = Vec::with_capacity(height);
        let mut last_locked = ptr::null_mut();

        for level in 0..height {
            let pred = position.preds[level];
            let pred_ref = unsafe { &*pred };
            if pred != last_locked {
                locks.push(pred_ref.lock());
                last_locked = pred;
            }

            let succ = expected(level);
            let valid = !pred_ref.is_marked()
                && pred_ref.next(level) == succ
                && (!live_successor || !unsafe { (*succ).is_marked() });
            if !valid {
                return None;
            }
        }

        Some(locks)
    }

    // =========================================================================
    // Insert
    // =========================================================================

    fn upsert<F>(&self, key: K, value: V, existing: Existing<F>) -> Upserted<V>
    where
        F: FnOnce(&V) -> V,
        V: Clone,
    {
        let _pin = G::pin();
        let height = self.levels.random_level();
        let mut retry = Retry::new(self.options.retry, "put");

        loop {
            let position = self.search(&key);

            if let Some(found) = position.found() {
                let found = unsafe { &*found };
                if found.is_marked() {
                    // A remove is in flight; wait for it to unlink the node.
                    retry.wait();
                    continue;
                }
                while !found.is_fully_linked() {
                    retry.wait();
                }

                if matches!(existing, Existing::Keep) {
                    return Upserted::Present;
                }

                let lock = found.lock();
                if found.is_marked() {
                    drop(lock);
                    retry.wait();
                    continue;
                }
                let Existing::Update(update) = existing else {
                    return Upserted::Present;
                };

                let old = found.value_ptr();
                let (previous, current) = unsafe {
                    let current = update(&*old);
                    ((*old).clone(), current)
                };
                let replacement = Box::into_raw(Box::new(current.clone()));
                found.value.store(replacement, Ordering::Release);
                drop(lock);

                unsafe { self.guard.defer_destroy(old, drop_boxed::<V>) };
                return Upserted::Replaced { previous, current };
            }

            let expected = |level: usize| position.succs[level];
            let Some(locks) = self.lock_predecessors(&position, height, expected, true) else {
                retry.wait();
                continue;
            };

            let node = LazyNode::with_entry(key, value, height);
            unsafe {
                let new_node = &*node;
                for level in 0..height {
                    new_node.set_next(level, position.succs[level]);
                }
                new_node.prev.store(position.preds[0], Ordering::Release);

                for level in 0..height {
                    (*position.preds[level]).set_next(level, node);
                }
                (*position.succs[0]).prev.store(node, Ordering::Release);

                // Removal waits for fully_linked, so the count is raised first.
                self.len.fetch_add(1, Ordering::Relaxed);
                new_node.fully_linked.store(true, Ordering::Release);
            }
            drop(locks);
            return Upserted::Inserted;
        }
    }

    /// Insert or replace the value stored under `key`.
    pub fn put(&self, key: K, value: V) -> Put<V>
    where
        V: Clone,
    {
        let replacement = value.clone();
        self.put_with(key, value, move |_| replacement)
    }

    /// Insert `value` if `key` is absent, otherwise store `on_update(current)`.
    ///
    /// `on_update` runs under the node lock, at most once.
    pub fn put_with<F>(&self, key: K, value: V, on_update: F) -> Put<V>
    where
        F: FnOnce(&V) -> V,
        V: Clone,
    {
        let inserted = value.clone();
        match self.upsert(key, value, Existing::Update(on_update)) {
            Upserted::Replaced { previous, current } => Put {
                previous: Some(previous),
                current,
            },
            // `Present` is only reported for `Existing::Keep`.
            Upserted::Inserted | Upserted::Present => Put {
                previous: None,
                current: inserted,
            },
        }
    }

    /// Insert `value` only if `key` is absent. Returns whether it was inserted.
    pub fn add(&self, key: K, value: V) -> bool
    where
        V: Clone,
    {
        matches!(
            self.upsert(key, value, Existing::<fn(&V) -> V>::Keep),
            Upserted::Inserted
        )
    }

    // =========================================================================
    // Remove
    // =========================================================================

    fn remove_with<R>(&self, key: &K, read: impl FnOnce(&V) -> R) -> Option<R> {
        let _pin = G::pin();
        let mut retry = Retry::new(self.options.retry, "remove");
        let mut victim: Option<LazyNodePtr<K, V>> = None;
        let mut victim_lock: Option<MutexGuard<'_, ()>> = None;

        loop {
            let position = self.search(key);

            let node = match victim {
                Some(node) => node,
                None => {
                    let level = position.found_level?;
                    let candidate = position.succs[level];
                    let candidate_ref = unsafe { &*candidate };
                    // Only a complete tower, seen at its top level, is eligible.
                    let eligible = candidate_ref.is_fully_linked()
                        && candidate_ref.height == level + 1
                        && !candidate_ref.is_marked();
                    if !eligible {
                        return None;
                    }

                    let lock = candidate_ref.lock();
                    if candidate_ref.is_marked() {
                        // Someone else got here first and will unlink it.
                        return None;
                    }
                    candidate_ref.marked.store(true, Ordering::Release);
                    // Counted out before the unlink lets a new node take its place.
                    self.len.fetch_sub(1, Ordering::Relaxed);
                    victim = Some(candidate);
                    victim_lock = Some(lock);
                    candidate
                }
            };

            let victim_ref = unsafe { &*node };
            let height = victim_ref.height;
            let Some(locks) = self.lock_predecessors(&position, height, |_| node, false) else {
                // Already marked: only the physical unlink is retried.
                retry.wait();
                continue;
            };

            unsafe {
                for level in (0..height).rev() {
                    (*position.preds[level]).set_next(level, victim_ref.next(level));
                }
                (*victim_ref.next(0))
                    .prev
                    .store(position.preds[0], Ordering::Release);
            }

            let result = unsafe { victim_ref.value() }.map(read);
            drop(locks);
            drop(victim_lock);

            unsafe { self.guard.defer_destroy(node, LazyNode::dealloc) };
            return result;
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

    fn cursor_at(
        &self,
        node: LazyNodePtr<K, V>,
        pin: G::ReadGuard,
    ) -> LazyCursor<'_, K, V, G, C> {
        LazyCursor {
            list: self,
            node,
            _pin: pin,
        }
    }

    /// Cursor at the first node whose key is at least `bound`, or at the first node.
    pub fn begin(&self, bound: Option<&K>) -> LazyCursor<'_, K, V, G, C> {
        let pin = G::pin();
        let node = match bound {
            Some(key) => self.search(key).succs[0],
            None => unsafe { (*self.head).next(0) },
        };
        self.cursor_at(node, pin)
    }

    /// Cursor at the last node whose key is at most `bound`, or at the last node.
    pub fn end(&self, bound: Option<&K>) -> LazyCursor<'_, K, V, G, C> {
        let pin = G::pin();
        let node = match bound {
            Some(key) => {
                let position = self.search(key);
                position.found().unwrap_or(position.preds[0])
            }
            None => unsafe { (*self.tail).prev.load(Ordering::Acquire) },
        };
        self.cursor_at(node, pin)
    }

    /// Iterator over live entries in key order.
    pub fn iter(&self) -> Entries<LazyCursor<'_, K, V, G, C>> {
        let pin = G::pin();
        Entries::new(self.cursor_at(self.head, pin))
    }
}

impl<K: Clone, V: Clone, G: Guard, C: Comparator<K>> LazySkipList<K, V, G, C> {
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
        let mut node = self.search(key).succs[0];
        while node != self.tail {
            let node_ref = unsafe { &*node };
            if node_ref.is_live() {
                return unsafe { entry_of(node_ref) };
            }
            node = node_ref.next(0);
        }
        None
    }

    /// Largest live entry with a key less than or equal to `key`.
    pub fn floor(&self, key: &K) -> Option<(K, V)> {
        let _pin = G::pin();
        let mut retry = Retry::new(self.options.retry, "floor");

        loop {
            let position = self.search(key);
            let candidate = match position.found() {
                Some(found) if unsafe { (*found).is_live() } => found,
                _ => position.preds[0],
            };
            if candidate == self.head {
                return None;
            }

            let candidate_ref = unsafe { &*candidate };
            if candidate_ref.is_live() {
                return unsafe { entry_of(candidate_ref) };
            }
            // The predecessor is being inserted or removed; look again.
            retry.wait();
        }
    }
}

/// # Safety
/// The caller must hold a pinned guard.
unsafe fn entry_of<K: Clone, V: Clone>(node: &LazyNode<K, V>) -> Option<(K, V)> {
    let key = node.key.as_ref()?;
    let value = unsafe { node.value() }?;
    Some((key.clone(), value.clone()))
}

impl<K, V, G, C> ConcurrentSkipList<K, V> for LazySkipList<K, V, G, C>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
    G: Guard,
    C: Comparator<K>,
{
    type Cursor<'a>
        = LazyCursor<'a, K, V, G, C>
    where
        Self: 'a;

    fn insert(&self, key: K, value: V) -> bool {
        self.add(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        LazySkipList::remove(self, key)
    }

    fn delete(&self, key: &K) -> bool {
        LazySkipList::delete(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        LazySkipList::contains(self, key)
    }

    fn get(&self, key: &K) -> Option<V> {
        LazySkipList::get(self, key)
    }

    fn len(&self) -> usize {
        LazySkipList::len(self)
    }

    fn to_vec(&self) -> Vec<(K, V)> {
        LazySkipList::to_vec(self)
    }

    fn begin(&self, bound: Option<&K>) -> Self::Cursor<'_> {
        LazySkipList::begin(self, bound)
    }
}

/// Level-0 dump: `[h] > [3] > [6(2)]* > [t]`, tower heights above one in parentheses,
/// marked nodes starred.
impl<K: fmt::Debug, V, G: Guard, C> fmt::Debug for LazySkipList<K, V, G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _pin = G::pin();
        write!(f, "[h]")?;

        let mut node = unsafe { (*self.head).next(0) };
        while node != self.tail {
            let node_ref = unsafe { &*node };
            if let Some(key) = &node_ref.key {
                if node_ref.height > 1 {
                    write!(f, " > [{:?}({})]", key, node_ref.height)?;
                } else {
                    write!(f, " > [{:?}]", key)?;
                }
                if node_ref.is_marked() {
                    write!(f, "*")?;
                }
            }
            node = node_ref.next(0);
        }

        write!(f, " > [t]")
    }
}

impl<K, V, G, C> Drop for LazySkipList<K, V, G, C> {
    fn drop(&mut self) {
        // Everything still on level 0, sentinels included. Unlinked nodes belong to the guard.
        let mut node = self.head;
        while !node.is_null() {
            let next = if node == self.tail {
                ptr::null_mut()
            } else {
                unsafe { (*node).next(0) }
            };
            unsafe { LazyNode::dealloc(node) };
            node = next;
        }
    }
}

// ============================================================================
// LazyCursor
// ============================================================================

/// Bidirectional cursor over a [`LazySkipList`].
///
/// Holds a pinned read guard for its whole lifetime, so the node under the cursor stays
/// readable even after it is removed.
pub struct LazyCursor<'a, K, V, G: Guard, C> {
    list: &'a LazySkipList<K, V, G, C>,
    node: LazyNodePtr<K, V>,
    _pin: G::ReadGuard,
}

impl<K, V, G: Guard, C: Comparator<K>> SkipCursor for LazyCursor<'_, K, V, G, C> {
    type Key = K;
    type Value = V;

    fn is_present(&self) -> bool {
        self.node != self.list.head && self.node != self.list.tail
    }

    fn move_next(&mut self) -> bool {
        if self.node == self.list.tail {
            return false;
        }
        self.node = unsafe { (*self.node).next(0) };
        true
    }

    fn is_marked(&self) -> bool {
        self.is_present() && unsafe { (*self.node).is_marked() }
    }

    fn key(&self) -> Option<&K> {
        if !self.is_present() {
            return None;
        }
        unsafe { (*self.node).key.as_ref() }
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

impl<K, V, G: Guard, C: Comparator<K>> BidirectionalCursor for LazyCursor<'_, K, V, G, C> {
    fn move_prev(&mut self) -> bool {
        if self.node == self.list.head {
            return false;
        }
        self.node = unsafe { (*self.node).prev.load(Ordering::Acquire) };
        true
    }
}
