use bucket_tree::{BPlusTree, Order, RangeOptions};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;

const N: usize = 10_000;

/// Distinct keys; each carries `VALUES_PER_KEY` values.
const VALUES_PER_KEY: i64 = 4;

// ─── Helper functions to generate key sequences ─────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

fn key_orders() -> [(&'static str, Vec<i64>); 3] {
    [
        ("ordered", ordered_keys(N)),
        ("reverse", reverse_ordered_keys(N)),
        ("random", random_keys(N)),
    ]
}

fn build_tree(keys: &[i64]) -> BPlusTree<i64, i64> {
    keys.iter().flat_map(|&k| (0..VALUES_PER_KEY).map(move |v| (k, v))).collect()
}

/// The baseline: a standard map holding a sorted `Vec` per key.
fn build_btreemap(keys: &[i64]) -> BTreeMap<i64, Vec<i64>> {
    let mut map: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for &k in keys {
        for v in 0..VALUES_PER_KEY {
            insert_sorted(&mut map, k, v);
        }
    }
    map
}

fn insert_sorted(map: &mut BTreeMap<i64, Vec<i64>>, key: i64, value: i64) {
    let bucket = map.entry(key).or_default();
    let at = bucket.partition_point(|x| *x <= value);
    bucket.insert(at, value);
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for (name, keys) in key_orders() {
        group.bench_function(BenchmarkId::new("BPlusTree", name), |b| {
            b.iter(|| build_tree(&keys));
        });

        group.bench_function(BenchmarkId::new("BTreeMap<Vec>", name), |b| {
            b.iter(|| build_btreemap(&keys));
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for (name, keys) in key_orders() {
        let tree = build_tree(&keys);
        let map = build_btreemap(&keys);

        group.bench_function(BenchmarkId::new("BPlusTree", name), |b| {
            b.iter(|| keys.iter().map(|k| tree.get(k).len()).sum::<usize>());
        });

        group.bench_function(BenchmarkId::new("BTreeMap<Vec>", name), |b| {
            b.iter(|| keys.iter().map(|k| map.get(k).map_or(0, Vec::len)).sum::<usize>());
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");

    for (name, keys) in key_orders() {
        group.bench_function(BenchmarkId::new("BPlusTree", name), |b| {
            b.iter_batched(
                || build_tree(&keys),
                |mut tree| {
                    for &k in &keys {
                        for v in 0..VALUES_PER_KEY {
                            tree.remove(&k, &v);
                        }
                    }
                    tree
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(BenchmarkId::new("BTreeMap<Vec>", name), |b| {
            b.iter_batched(
                || build_btreemap(&keys),
                |mut map| {
                    for &k in &keys {
                        for v in 0..VALUES_PER_KEY {
                            if let Some(bucket) = map.get_mut(&k)
                                && let Some(at) = bucket.iter().position(|x| *x == v)
                            {
                                bucket.remove(at);
                                if bucket.is_empty() {
                                    map.remove(&k);
                                }
                            }
                        }
                    }
                    map
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let keys = random_keys(N);
    let tree = build_tree(&keys);
    let map = build_btreemap(&keys);
    let (lower, upper) = (i64::from(u32::MAX / 4), i64::from(u32::MAX / 2));

    let mut group = c.benchmark_group("scan");

    group.bench_function("BPlusTree/get_all", |b| {
        b.iter(|| tree.get_all(Order::Ascending).len());
    });

    group.bench_function("BTreeMap<Vec>/values", |b| {
        b.iter(|| map.values().flatten().collect::<Vec<_>>().len());
    });

    group.bench_function("BPlusTree/get_range", |b| {
        b.iter(|| tree.get_range(&lower, &upper, RangeOptions::new()).len());
    });

    group.bench_function("BTreeMap<Vec>/range", |b| {
        b.iter(|| map.range(lower..upper).flat_map(|(_, bucket)| bucket).collect::<Vec<_>>().len());
    });

    group.finish();
}

fn bench_branching_factor(c: &mut Criterion) {
    let keys = random_keys(N);

    let mut group = c.benchmark_group("branching_factor");

    for branching_factor in [4, 16, 50, 128] {
        group.bench_function(BenchmarkId::new("insert", branching_factor), |b| {
            b.iter(|| {
                let mut tree = BPlusTree::with_branching_factor(branching_factor).expect("valid branching factor");
                for &k in &keys {
                    tree.insert(k, k);
                }
                tree
            });
        });
    }

    group.finish();
}

// ─── Criterion Groups ───────────────────────────────────────────────────────

criterion_group!(crud_benches, bench_insert, bench_get, bench_remove);

criterion_group!(scan_benches, bench_scan, bench_branching_factor);

criterion_main!(crud_benches, scan_benches);
