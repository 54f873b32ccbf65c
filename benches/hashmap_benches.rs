use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use rand::prelude::SliceRandom;
use std::hint::black_box;
use std::sync::Barrier;
use std::thread;
use syncmap::SyncMap;

const KEYS: usize = 10_000;

// (label, percentage of operations that write)
const MIXES: [(&str, u32); 3] = [("read_heavy", 20), ("mixed", 50), ("write_heavy", 80)];

fn preloaded() -> SyncMap<String, String> {
    (0..KEYS).map(|i| (format!("key{}", i), format!("value{}", i))).collect()
}

fn shuffled_keys() -> Vec<String> {
    let mut keys: Vec<String> = (0..KEYS).map(|i| format!("key{}", i)).collect();
    keys.shuffle(&mut rand::rng());
    keys
}

fn single_key_ops(c: &mut Criterion) {
    let map = preloaded();
    let keys = shuffled_keys();

    for threads in [2, 4, 8] {
        let mut group = c.benchmark_group(format!("single_key_{}_threads", threads));
        group.throughput(Throughput::Elements(KEYS as u64));

        for (label, write_pct) in MIXES {
            group.bench_function(BenchmarkId::new(label, KEYS), |b| {
                b.iter(|| {
                    let start = Barrier::new(threads);
                    thread::scope(|s| {
                        for t in 0..threads {
                            let (map, keys, start) = (&map, &keys, &start);
                            s.spawn(move || {
                                let mut rng = rand::rng();
                                start.wait();
                                for key in keys.iter().skip(t).step_by(threads) {
                                    if rng.random_range(0..100) < write_pct {
                                        map.store(key.clone(), key.to_uppercase());
                                    } else {
                                        black_box(map.load(key));
                                    }
                                }
                            });
                        }
                    });
                });
            });
        }

        group.finish();
    }
}

fn snapshot_under_writes(c: &mut Criterion) {
    let map = preloaded();
    let mut group = c.benchmark_group("to_map");
    group.throughput(Throughput::Elements(KEYS as u64));

    for writers in [0, 2] {
        group.bench_function(BenchmarkId::new("writers", writers), |b| {
            b.iter(|| {
                thread::scope(|s| {
                    for w in 0..writers {
                        let map = &map;
                        s.spawn(move || {
                            for i in (w..KEYS).step_by(writers) {
                                map.swap(format!("key{}", i), format!("value{}", i));
                            }
                        });
                    }
                    black_box(map.to_map());
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, single_key_ops, snapshot_under_writes);
criterion_main!(benches);
