//! Internal implementation details.
//!
//! These are pub(crate) and not intended for external use.

pub(crate) mod marked_ptr;
pub(crate) mod retry;
pub(crate) mod search;
pub(crate) mod tower;

pub(crate) use marked_ptr::MarkedPtr;
pub(crate) use retry::Retry;
pub(crate) use search::{Position, SearchNode, Traversal, descend, descend_to_last};
