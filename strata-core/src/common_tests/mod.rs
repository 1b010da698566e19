//! Generic test bodies shared by the integration tests of every crate.
//!
//! Each function runs against any [`ConcurrentSkipList`](crate::ConcurrentSkipList), so the
//! same workload checks both strategies under every guard.

pub mod skip_list_stress_tests;
