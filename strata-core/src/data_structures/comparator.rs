//! Key ordering supplied at list construction.

use std::cmp::Ordering;

/// A total order over keys.
///
/// Both skip lists call the comparator from many threads at once, hence `Send + Sync`.
/// Sentinels are recognised by identity and never reach `compare`.
pub trait Comparator<K>: Send + Sync {
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;

    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        self.compare(lhs, rhs) == Ordering::Less
    }

    #[inline]
    fn same_key(&self, lhs: &K, rhs: &K) -> bool {
        self.compare(lhs, rhs) == Ordering::Equal
    }
}

/// Orders keys by their `Ord` implementation.
#[derive(Default, Debug, Clone, Copy)]
pub struct OrdComparator;

impl<K: Ord> Comparator<K> for OrdComparator {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// Any thread-safe comparison closure is a comparator.
impl<K, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self(lhs, rhs)
    }
}

/// Reverses another comparator.
#[derive(Default, Debug, Clone, Copy)]
pub struct Reverse<C>(pub C);

impl<K, C: Comparator<K>> Comparator<K> for Reverse<C> {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self.0.compare(rhs, lhs)
    }
}
