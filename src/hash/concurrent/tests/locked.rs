use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use std::sync::Barrier;
use std::thread;

use super::super::LockedMap;
use super::super::prelude::*;

#[test]
fn test_insert_or_keep() {
    let map = LockedMap::<String, i32>::new();

    // Vacant: the value is stored
    let kept = map.insert_or_keep("a".to_string(), 1, |v| Some(*v));
    assert_eq!(kept, None);
    assert_eq!(map.view("a", |_, v| *v), Some(1));
    assert_eq!(map.len(), 1);

    // Occupied and accepted: the existing value stays
    let kept = map.insert_or_keep("a".to_string(), 2, |v| Some(*v));
    assert_eq!(kept, Some(1));
    assert_eq!(map.view("a", |_, v| *v), Some(1));

    // Occupied but rejected: replaced in place, count unchanged
    let kept = map.insert_or_keep("a".to_string(), 3, |_| None::<i32>);
    assert_eq!(kept, None);
    assert_eq!(map.view("a", |_, v| *v), Some(3));
    assert_eq!(map.len(), 1);
}

#[test]
fn test_insert_or_keep_race_has_one_winner() {
    let num_threads = 8;
    let map: Arc<LockedMap<u32, usize>> = Arc::new(LockedMap::with_shards(4));
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..100u32)
                    .filter(|&key| map.insert_or_keep(key, t, |v| Some(*v)).is_none())
                    .count()
            })
        })
        .collect();

    let stored: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(stored, 100);
    assert_eq!(map.len(), 100);
}

#[test]
fn test_for_each_entry_visits_everything() {
    let map = LockedMap::<i32, i32>::new();
    for i in 0..64 {
        map.insert(i, i * 10);
    }

    let mut seen = Vec::new();
    map.for_each_entry(|k, v| {
        seen.push((*k, *v));
        true
    });
    seen.sort_unstable();
    assert_eq!(seen, (0..64).map(|i| (i, i * 10)).collect::<Vec<_>>());
}

#[test]
fn test_for_each_entry_stops_early() {
    let map = LockedMap::<i32, i32>::with_shards(8);
    for i in 0..64 {
        map.insert(i, i);
    }

    let mut calls = 0;
    map.for_each_entry(|_, _| {
        calls += 1;
        calls < 3
    });
    assert_eq!(calls, 3);
}

#[test]
fn test_for_each_entry_allows_writes_to_same_map() {
    let map = LockedMap::<i32, i32>::new();
    for i in 0..32 {
        map.insert(i, i);
    }

    // Would deadlock if a shard lock were held across the callback
    map.for_each_entry(|k, _| {
        if *k < 1000 {
            map.remove(k);
            map.insert(k + 1000, 0);
        }
        true
    });

    for i in 0..32 {
        assert!(!map.contains_key(&i));
        assert!(map.contains_key(&(i + 1000)));
    }
    assert_eq!(map.len(), 32);
}

#[test]
#[should_panic(expected = "power of two")]
fn test_rejects_odd_shard_count() {
    let _ = LockedMap::<i32, i32>::with_shards(12);
}
