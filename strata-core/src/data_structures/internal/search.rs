// =============================================================================
// SEARCH PROTOCOL
// =============================================================================
//
// Both skip lists share one top-down descent. Starting at HEAD on the highest level,
// the descent moves right while the next node's key is less than the target, records
// the (pred, succ) pair it stopped at, and drops one level:
//
// Level 2:  HEAD ──────────► 10 ─────────────────────► 30 ──────────► TAIL
//                            pred[2]                   succ[2]
// Level 1:  HEAD ──────────► 10 ──────────► 20 ──────► 30 ──────────► TAIL
//                                           pred[1]    succ[1]
// Level 0:  HEAD ──────────► 10 ──────────► 20 ──────► 30 ──► 40 ───► TAIL
//                                           pred[0]    succ[0]          (target 25)
//
// found_level is the highest level whose succ holds exactly the target key.
//
// Marked links only exist in the lock-free list. When the successor's own link at the
// current level is marked, the node is logically deleted there and the traversal does not
// stop on it:
//   - Help:     CAS pred.next from curr to succ. A failed CAS means pred changed under
//               us (pred got marked, or something was inserted), so restart from HEAD.
//   - ReadOnly: step over the marked node without writing.
//
// HEAD and TAIL are recognised by identity. They never reach the comparator.
//
// =============================================================================

use std::ptr;

use crate::config::MAX_LEVEL;
use crate::data_structures::comparator::Comparator;
use crate::data_structures::internal::marked_ptr::MarkedPtr;

/// A node the shared descent can walk over.
pub(crate) trait SearchNode: Sized {
    type Key;

    /// Key of a data node, `None` for sentinels.
    fn search_key(&self) -> Option<&Self::Key>;

    /// Successor link at `level`, with the mark of this node at that level.
    fn link(&self, level: usize) -> MarkedPtr<Self>;

    /// Physically unlink `curr`, whose link at `level` is marked, from `pred`.
    ///
    /// Returns `false` when `pred` no longer points at `curr` and the descent must restart.
    ///
    /// # Safety
    /// All three pointers must be protected by the caller's pinned guard.
    unsafe fn snip(pred: *mut Self, level: usize, curr: *mut Self, succ: *mut Self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Traversal {
    /// Unlink marked nodes on the way.
    Help,
    /// Step over marked nodes, never write.
    ReadOnly,
}

/// Predecessors and successors of a key at every level.
pub(crate) struct Position<N> {
    pub(crate) preds: [*mut N; MAX_LEVEL],
    pub(crate) succs: [*mut N; MAX_LEVEL],
    pub(crate) found_level: Option<usize>,
}

impl<N> Position<N> {
    fn empty() -> Self {
        Position {
            preds: [ptr::null_mut(); MAX_LEVEL],
            succs: [ptr::null_mut(); MAX_LEVEL],
            found_level: None,
        }
    }

    /// The node holding the key, taken at the highest level it was seen on.
    #[inline]
    pub(crate) fn found(&self) -> Option<*mut N> {
        self.found_level.map(|level| self.succs[level])
    }
}

/// Walk from `head` down through `levels` levels towards `key`.
///
/// # Safety
/// `head` and `tail` must be the sentinels of a live list of at least `levels` levels, and
/// the caller must hold a pinned guard for as long as it uses the returned pointers.
pub(crate) unsafe fn descend<N, C>(
    head: *mut N,
    tail: *mut N,
    levels: usize,
    key: &N::Key,
    comparator: &C,
    traversal: Traversal,
) -> Position<N>
where
    N: SearchNode,
    C: Comparator<N::Key>,
{
    'restart: loop {
        let mut position = Position::empty();
        let mut pred = head;

        for level in (0..levels).rev() {
            let mut curr = unsafe { (*pred).link(level).as_ptr() };

            while curr != tail {
                let succ = unsafe { (*curr).link(level) };
                if succ.is_marked() {
                    if traversal == Traversal::Help
                        && !unsafe { N::snip(pred, level, curr, succ.as_ptr()) }
                    {
                        continue 'restart;
                    }
                    curr = succ.as_ptr();
                    continue;
                }

                match unsafe { (*curr).search_key() } {
                    Some(curr_key) if comparator.less(curr_key, key) => {
                        pred = curr;
                        curr = succ.as_ptr();
                    }
                    _ => break,
                }
            }

            if position.found_level.is_none() && curr != tail {
                let same = unsafe { (*curr).search_key() }
                    .is_some_and(|curr_key| comparator.same_key(curr_key, key));
                if same {
                    position.found_level = Some(level);
                }
            }

            position.preds[level] = pred;
            position.succs[level] = curr;
        }

        return position;
    }
}

/// Walk to the last data node on level 0, or `head` when the list is empty.
///
/// # Safety
/// Same contract as [`descend`].
pub(crate) unsafe fn descend_to_last<N: SearchNode>(
    head: *mut N,
    tail: *mut N,
    levels: usize,
) -> *mut N {
    let mut pred = head;
    for level in (0..levels).rev() {
        loop {
            let next = unsafe { (*pred).link(level).as_ptr() };
            if next == tail {
                break;
            }
            // Skip over nodes deleted at this level; the chain still leads to TAIL.
            let mut candidate = next;
            while candidate != tail && unsafe { (*candidate).link(level).is_marked() } {
                candidate = unsafe { (*candidate).link(level).as_ptr() };
            }
            if candidate == tail {
                break;
            }
            pred = candidate;
        }
    }
    pred
}
