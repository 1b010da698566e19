//! Common stress tests for ConcurrentSkipList implementations.
//!
//! These tests verify concurrent correctness under high contention.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::data_structures::{ConcurrentSkipList, SkipCursor};

fn assert_strictly_sorted(entries: &[(i32, i32)]) {
    for pair in entries.windows(2) {
        assert!(
            pair[0].0 < pair[1].0,
            "Order violated or duplicate key: {:?} before {:?}",
            pair[0],
            pair[1]
        );
    }
}

/// N threads add the same key at once: exactly one wins.
pub fn test_race_on_identical_key<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    for _ in 0..20 {
        let list = Arc::new(L::default());
        let num_threads = 16;
        let barrier = Arc::new(Barrier::new(num_threads));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..num_threads)
            .map(|thread_id| {
                let list = Arc::clone(&list);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    barrier.wait();
                    if list.insert(42, thread_id as i32) {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::Relaxed), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.to_vec().len(), 1);
    }
}

/// One writer alternates add/delete of a key while readers watch it.
///
/// The writer is the only thread touching the key, so each of its own operations must
/// succeed. Readers must never see the key twice or out of order on level 0.
pub fn test_insert_delete_race_same_key<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let key = 500;
    for neighbour in [key - 2, key - 1, key + 1, key + 2] {
        list.insert(neighbour, neighbour);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let observed_present = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let list = Arc::clone(&list);
            let stop = Arc::clone(&stop);
            let observed_present = Arc::clone(&observed_present);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    if list.contains(&key) {
                        observed_present.fetch_add(1, Ordering::Relaxed);
                    }

                    let entries = list.to_vec();
                    assert_strictly_sorted(&entries);
                    let copies = entries.iter().filter(|(k, _)| *k == key).count();
                    assert!(copies <= 1, "Key {} seen {} times", key, copies);

                    // Neighbours are never touched.
                    assert!(list.contains(&(key - 1)));
                    assert!(list.contains(&(key + 1)));
                }
            })
        })
        .collect();

    let writer = {
        let list = Arc::clone(&list);
        thread::spawn(move || {
            for round in 0..20_000 {
                assert!(list.insert(key, round), "Add failed in round {}", round);
                assert!(list.contains(&key));
                assert!(list.delete(&key), "Delete failed in round {}", round);
                assert!(!list.contains(&key));
            }
        })
    };

    writer.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(!list.contains(&key));
    assert_eq!(list.len(), 4);
    println!(
        "Readers saw key {} present {} times",
        key,
        observed_present.load(Ordering::Relaxed)
    );
}

/// A level-0 cursor and `contains` agree on the key whenever no write is in flight.
///
/// The writer bumps `started` before and `completed` after each operation. A reader
/// whose window saw `completed == started` observed a settled list: the key is present
/// exactly when an odd number of operations has finished.
pub fn test_cursor_agrees_with_contains<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let key = 500;
    for neighbour in [key - 1, key + 1] {
        list.insert(neighbour, neighbour);
    }

    let started = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let settled = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let list = Arc::clone(&list);
            let started = Arc::clone(&started);
            let completed = Arc::clone(&completed);
            let stop = Arc::clone(&stop);
            let settled = Arc::clone(&settled);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let before = completed.load(Ordering::SeqCst);

                    let cursor = list.begin(Some(&key));
                    let seen = cursor.key() == Some(&key) && !cursor.is_marked();
                    drop(cursor);
                    let contained = list.contains(&key);

                    if started.load(Ordering::SeqCst) != before {
                        continue;
                    }
                    let present = before % 2 == 1;
                    assert_eq!(seen, present, "cursor after {} operations", before);
                    assert_eq!(contained, present, "contains after {} operations", before);
                    settled.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writer = {
        let list = Arc::clone(&list);
        let started = Arc::clone(&started);
        let completed = Arc::clone(&completed);
        thread::spawn(move || {
            for round in 0..10_000 {
                started.fetch_add(1, Ordering::SeqCst);
                assert!(list.insert(key, round));
                completed.fetch_add(1, Ordering::SeqCst);

                started.fetch_add(1, Ordering::SeqCst);
                assert!(list.delete(&key));
                completed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    writer.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(!list.contains(&key));
    assert_eq!(list.len(), 2);
    println!("Settled observations: {}", settled.load(Ordering::Relaxed));
}

/// One thread adds and another deletes the same key; the count never leaves `0..=1`.
pub fn test_len_stays_in_bounds_on_one_key<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let key = 7;
    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(2));

    let reader = {
        let list = Arc::clone(&list);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let len = list.len();
                assert!(len <= 1, "len {} with a single key", len);
            }
        })
    };

    let adder = {
        let list = Arc::clone(&list);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for round in 0..50_000 {
                list.insert(key, round);
            }
        })
    };

    let deleter = {
        let list = Arc::clone(&list);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50_000 {
                list.delete(&key);
            }
        })
    };

    adder.join().unwrap();
    deleter.join().unwrap();
    stop.store(true, Ordering::Relaxed);
    reader.join().unwrap();

    assert_eq!(list.len(), list.to_vec().len());
    assert_eq!(list.is_empty(), !list.contains(&key));
}

/// Test concurrent delete of the same value - exactly one should succeed
pub fn test_concurrent_delete_same_value<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let num_threads = 64;
    let test_value = 42;

    list.insert(test_value, test_value);

    let success_count = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let list = Arc::clone(&list);
            let success = Arc::clone(&success_count);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if list.remove(&test_value) == Some(test_value) {
                    success.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        success_count.load(Ordering::Relaxed),
        1,
        "Exactly one thread should successfully delete the value"
    );
    assert!(!list.contains(&test_value), "Value should be gone");
    assert!(list.is_empty());
}

/// Test linearizability - operations appear to take effect atomically
pub fn test_linearizability<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let num_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let num_ops = 5000;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..num_ops {
                    let key = (t * num_ops + i) as i32;

                    // Insert must return true for new key
                    assert!(list.insert(key, i as i32), "Failed to insert unique key {}", key);

                    // Immediately after insert, must be findable
                    assert_eq!(list.get(&key), Some(i as i32), "Key {} lost after insert", key);

                    // Delete must succeed for existing key
                    assert!(list.delete(&key), "Failed to delete existing key {}", key);

                    // After delete, must not be findable
                    assert!(!list.contains(&key), "Key {} found after delete", key);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(list.is_empty());
    assert!(list.to_vec().is_empty());
}

/// Overlapping inserts and deletes from many threads; at quiescence the list holds each
/// key at most once, in order, and the counter agrees with a full scan.
pub fn test_no_duplicates_under_contention<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let num_threads = 12;
    let key_space = 64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..3000 {
                    let key = fastrand::i32(0..key_space);
                    if (round + t) % 3 == 0 {
                        list.delete(&key);
                    } else {
                        list.insert(key, key);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = list.to_vec();
    assert_strictly_sorted(&entries);
    assert_eq!(entries.len(), list.len());
    for (key, value) in entries {
        assert_eq!(key, value);
        assert!(list.contains(&key));
    }
}

/// Test concurrent lookups during modifications
pub fn test_find_during_modifications<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let stop_flag = Arc::new(AtomicBool::new(false));

    // Pre-populate with even numbers
    for i in 0..1000 {
        list.insert(i * 2, i * 2);
    }

    let mut handles = vec![];

    // Modifier threads touch odd keys only
    for t in 0..4 {
        let list = Arc::clone(&list);
        let stop = Arc::clone(&stop_flag);
        handles.push(thread::spawn(move || {
            let mut i = 0;
            while !stop.load(Ordering::Relaxed) {
                let key = (t * 500 + i % 500) * 2 + 1;
                if i % 2 == 0 {
                    list.insert(key, key);
                } else {
                    list.delete(&key);
                }
                i += 1;
            }
        }));
    }

    // Finder threads: even keys must always be there
    for _ in 0..4 {
        let list = Arc::clone(&list);
        let stop = Arc::clone(&stop_flag);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                for i in 0..1000 {
                    assert_eq!(list.get(&(i * 2)), Some(i * 2), "Lost stable key {}", i * 2);
                }
            }
        }));
    }

    thread::sleep(Duration::from_secs(1));
    stop_flag.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().unwrap();
    }

    let entries = list.to_vec();
    assert_strictly_sorted(&entries);
    assert_eq!(entries.len(), list.len());
}

/// Test memory ordering between producer and consumer
pub fn test_memory_ordering<L>()
where
    L: ConcurrentSkipList<i32, i32> + Default + 'static,
{
    let list = Arc::new(L::default());
    let data = Arc::new(AtomicUsize::new(0));
    let flag = Arc::new(AtomicBool::new(false));

    let producer = {
        let list = Arc::clone(&list);
        let data = Arc::clone(&data);
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            data.store(42, Ordering::Release);
            list.insert(100, 1);
            flag.store(true, Ordering::Release);
        })
    };

    let consumer = thread::spawn(move || {
        while !flag.load(Ordering::Acquire) {
            thread::yield_now();
        }
        assert!(list.contains(&100));
        assert_eq!(list.get(&100), Some(1));
        assert_eq!(data.load(Ordering::Acquire), 42);
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}
