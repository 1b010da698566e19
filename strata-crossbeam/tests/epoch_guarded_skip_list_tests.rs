use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use rstest::rstest;
use serial_test::serial;
use strata_core::common_tests::skip_list_core_tests::*;
use strata_core::common_tests::skip_list_stress_tests::*;
use strata_core::{BidirectionalCursor, ConcurrentSkipList, SkipCursor};
use strata_crossbeam::{LazySkipMap, LockFreeSkipMap};

// Type aliases for cleaner test code
type EpochLazy = LazySkipMap<i32, i32>;
type EpochLockFree = LockFreeSkipMap<i32, i32>;

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn test_basic<L: ConcurrentSkipList<i32, i32>>(#[case] list: L) {
    test_basic_operations(&list);
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn test_remove_twice<L: ConcurrentSkipList<i32, i32>>(#[case] list: L) {
    test_remove_is_idempotent(&list);
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn test_sequential<L: ConcurrentSkipList<i32, i32>>(#[case] list: L) {
    test_sequential_workload(&list);
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn test_concurrent<L: ConcurrentSkipList<i32, i32> + Default + 'static>(#[case] _list: L) {
    test_concurrent_inserts::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_race_on_identical_key<L: ConcurrentSkipList<i32, i32> + Default + 'static>(
    #[case] _list: L,
) {
    test_race_on_identical_key::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_insert_delete_race_same_key<L: ConcurrentSkipList<i32, i32> + Default + 'static>(
    #[case] _list: L,
) {
    test_insert_delete_race_same_key::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_no_duplicates<L: ConcurrentSkipList<i32, i32> + Default + 'static>(#[case] _list: L) {
    test_no_duplicates_under_contention::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_find_during_modifications<L: ConcurrentSkipList<i32, i32> + Default + 'static>(
    #[case] _list: L,
) {
    test_find_during_modifications::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_cursor_agrees_with_contains<L: ConcurrentSkipList<i32, i32> + Default + 'static>(
    #[case] _list: L,
) {
    test_cursor_agrees_with_contains::<L>();
}

#[rstest]
#[serial]
#[case::lazy(EpochLazy::default())]
#[case::lock_free(EpochLockFree::default())]
fn stress_len_stays_in_bounds_on_one_key<L: ConcurrentSkipList<i32, i32> + Default + 'static>(
    #[case] _list: L,
) {
    test_len_stays_in_bounds_on_one_key::<L>();
}

#[test]
#[serial]
fn test_guarded_ref_outlives_removal() {
    let list: LockFreeSkipMap<i32, String> = LockFreeSkipMap::new();
    list.add(1, "one".to_string());

    let value = list.find(&1).unwrap();
    assert!(list.delete(&1));
    assert!(!list.contains(&1));

    // Still pinned: the removed node has not been reclaimed.
    assert_eq!(value.as_str(), "one");
}

#[test]
#[serial]
fn test_lazy_put_under_concurrent_readers() {
    let map: Arc<LazySkipMap<u32, Vec<u32>>> = Arc::new(LazySkipMap::new());
    let stop = Arc::new(AtomicBool::new(false));
    map.put(0, vec![0; 8]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    // Every stored vector is uniform; a torn or freed value would not be.
                    let ok = map.find_and_apply(&0, |values| {
                        values.iter().all(|&value| value == values[0])
                    });
                    assert_eq!(ok, Some(true));
                }
            })
        })
        .collect();

    for round in 1..=2000 {
        let put = map.put(0, vec![round; 8]);
        assert_eq!(put.previous, Some(vec![round - 1; 8]));
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(map.get(&0), Some(vec![2000; 8]));
}

#[test]
#[serial]
fn test_put_with_counts_every_increment() {
    let map: Arc<LazySkipMap<&'static str, u64>> = Arc::new(LazySkipMap::new());
    let num_threads = 8;
    let increments = 1000;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..increments {
                    map.put_with("hits", 1, |count| count + 1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.get(&"hits"), Some((num_threads * increments) as u64));
    assert_eq!(map.len(), 1);
}

#[test]
#[serial]
fn test_cursors_during_churn() {
    let map: Arc<LazySkipMap<i32, i32>> = Arc::new(LazySkipMap::new());
    for key in (0..1000).step_by(2) {
        map.add(key, key);
    }
    let stop = Arc::new(AtomicBool::new(false));
    let walks = Arc::new(AtomicUsize::new(0));

    let writer = {
        let map = Arc::clone(&map);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut round = 0;
            while !stop.load(Ordering::Relaxed) {
                let key = (round % 500) * 2 + 1;
                map.add(key, key);
                map.delete(&key);
                round += 1;
            }
        })
    };

    let walkers: Vec<_> = (0..3)
        .map(|_| {
            let map = Arc::clone(&map);
            let walks = Arc::clone(&walks);
            thread::spawn(move || {
                for _ in 0..50 {
                    let mut cursor = map.begin(None);
                    let mut previous = None;
                    let mut even = 0;
                    while cursor.is_present() {
                        let key = *cursor.key().unwrap();
                        if let Some(previous) = previous {
                            assert!(previous < key, "{} then {}", previous, key);
                        }
                        if key % 2 == 0 {
                            even += 1;
                        }
                        previous = Some(key);
                        cursor.move_next();
                    }
                    assert_eq!(even, 500);

                    // Back links only ever point to smaller keys.
                    let mut cursor = map.end(None);
                    let mut next = None;
                    while cursor.is_present() {
                        let key = *cursor.key().unwrap();
                        if let Some(next) = next {
                            assert!(key < next, "{} before {}", key, next);
                        }
                        next = Some(key);
                        cursor.move_prev();
                    }
                    walks.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for walker in walkers {
        walker.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();

    assert_eq!(walks.load(Ordering::Relaxed), 150);
    assert_eq!(map.len(), 500);
}
