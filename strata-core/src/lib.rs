pub mod common_tests;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod guard;

pub use config::{BackoffStrategy, MAX_LEVEL, RetryPolicy, SkipListOptions};
pub use data_structures::{
    BidirectionalCursor, Comparator, ConcurrentSkipList, Entries, LazyCursor, LazySkipList,
    LockFreeCursor, LockFreeSkipList, OrdComparator, Put, SkipCursor,
};
pub use error::{Error, Result};

// Re-export guard types for convenience
pub use guard::{DeferredGuard, DeferredRef, Guard};

/*

cargo llvm-cov --html

sudo CARGO_PROFILE_RELEASE_DEBUG=true cargo flamegraph --bench skip_list_benchmark --root --

cargo valgrind test

*/
