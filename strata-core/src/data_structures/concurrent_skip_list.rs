use crate::data_structures::cursor::SkipCursor;

/// Operations shared by both skip list strategies.
///
/// Generic test bodies and benchmarks are written against this trait so the same workload
/// runs on the lazy and the lock-free list.
pub trait ConcurrentSkipList<K, V>: Send + Sync {
    type Cursor<'a>: SkipCursor<Key = K, Value = V>
    where
        Self: 'a;

    /// Insert if absent. Returns `false` when the key is already present.
    fn insert(&self, key: K, value: V) -> bool;

    fn remove(&self, key: &K) -> Option<V>;

    /// Returns whether this call removed the key.
    fn delete(&self, key: &K) -> bool;

    fn contains(&self, key: &K) -> bool;

    fn get(&self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entries in key order.
    fn to_vec(&self) -> Vec<(K, V)>;

    /// Level-0 cursor on the first node not below `bound`, or on the first node.
    fn begin(&self, bound: Option<&K>) -> Self::Cursor<'_>;
}
