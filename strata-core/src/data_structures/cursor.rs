//! Cursors over the level-0 chain of a skip list.
//!
//! A cursor is a position on a node, not a snapshot. It can observe nodes that are being
//! spliced in or marked concurrently, and it keeps working on a node that has been
//! removed after the cursor reached it: the removed node still points forward into the
//! list. Callers that need a consistent view must synchronize externally.
//!
//! ```text
//!  HEAD ──► 3 ──► 6 ──► 7* ──► 9 ──► TAIL        (* marked)
//!   ▲                                   ▲
//!   not present                         not present
//! ```

use std::cmp::Ordering;

/// A forward cursor.
pub trait SkipCursor {
    type Key;
    type Value;

    /// `false` exactly when the cursor sits on a sentinel.
    fn is_present(&self) -> bool;

    /// Step to the next node on level 0. Returns `false` when already at the tail.
    fn move_next(&mut self) -> bool;

    /// Whether the current node is logically deleted.
    fn is_marked(&self) -> bool;

    fn key(&self) -> Option<&Self::Key>;

    fn value(&self) -> Option<&Self::Value>;

    /// Order of the current node relative to `key`.
    ///
    /// The head sentinel orders before every key and the tail after every key.
    fn compare_to(&self, key: &Self::Key) -> Ordering;
}

/// A cursor that can also walk backwards.
pub trait BidirectionalCursor: SkipCursor {
    /// Step to the previous node on level 0. Returns `false` when already at the head.
    fn move_prev(&mut self) -> bool;
}

/// Iterator over the live entries reachable from a cursor.
///
/// Marked nodes are skipped. Keys and values are cloned out of the list so the items do
/// not borrow the cursor.
pub struct Entries<C> {
    cursor: C,
}

impl<C: SkipCursor> Entries<C> {
    /// Start iterating after the cursor's current position.
    ///
    /// A cursor placed on the head starts at the first entry; a cursor placed on a data
    /// node yields that node first.
    pub fn new(cursor: C) -> Self {
        Entries { cursor }
    }

    pub fn into_cursor(self) -> C {
        self.cursor
    }
}

impl<C> Iterator for Entries<C>
where
    C: SkipCursor,
    C::Key: Clone,
    C::Value: Clone,
{
    type Item = (C::Key, C::Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if !self.cursor.is_present() && !self.cursor.move_next() {
                return None;
            }
            if !self.cursor.is_present() {
                return None;
            }

            let item = if self.cursor.is_marked() {
                None
            } else {
                match (self.cursor.key(), self.cursor.value()) {
                    (Some(key), Some(value)) => Some((key.clone(), value.clone())),
                    _ => None,
                }
            };
            self.cursor.move_next();

            if item.is_some() {
                return item;
            }
        }
    }
}
