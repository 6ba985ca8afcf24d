use std::collections::BTreeMap;

use bucket_tree::{BPlusTree, Config, ConfigError, MIN_BRANCHING_FACTOR, NodeDump, Order, RangeOptions};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// Routes the tree's split/merge logging to the test output. Set `RUST_LOG=bucket_tree=trace` to see it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn tree(branching_factor: usize) -> BPlusTree<i32, i32> {
    init_tracing();
    BPlusTree::with_branching_factor(branching_factor).expect("valid branching factor")
}

/// Keys drawn from a small range so buckets fill up.
fn key_strategy() -> impl Strategy<Value = i32> {
    -300i32..300i32
}

fn value_strategy() -> impl Strategy<Value = i32> {
    0i32..8
}

/// Flattens a reference model the way the tree orders its values.
fn flatten(model: &BTreeMap<i32, Vec<i32>>) -> Vec<i32> {
    model.values().flatten().copied().collect()
}

fn owned(values: Vec<&i32>) -> Vec<i32> {
    values.into_iter().copied().collect()
}

/// Checks the structural guarantees visible from a dump: equal leaf depth, bounded
/// fanout, and a leaf chain that matches the left-to-right leaf order.
fn assert_well_formed(dump: &NodeDump<i32, i32>, config: &Config) {
    fn visit(node: &NodeDump<i32, i32>, depth: usize, is_root: bool, config: &Config, depths: &mut Vec<usize>) {
        assert!(node.keys.len() <= config.max_keys(), "node {} overflows", node.id);
        if !is_root {
            assert!(!node.keys.is_empty(), "node {} is empty", node.id);
        }
        if node.is_leaf() {
            assert_eq!(node.values.len(), node.keys.len());
            depths.push(depth);
        } else {
            assert_eq!(node.children.len(), node.keys.len() + 1);
            for child in &node.children {
                visit(child, depth + 1, false, config, depths);
            }
        }
    }

    let mut depths = Vec::new();
    visit(dump, 0, true, config, &mut depths);
    assert!(depths.windows(2).all(|pair| pair[0] == pair[1]), "leaves at different depths");

    let leaves = dump.leaves();
    for (i, leaf) in leaves.iter().enumerate() {
        assert_eq!(leaf.prev, i.checked_sub(1).map(|j| leaves[j].id));
        assert_eq!(leaf.next, leaves.get(i + 1).map(|next| next.id));
    }
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(i32, i32),
    Remove(i32, i32),
    RemoveKey(i32),
    Get(i32),
}

fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy()).prop_map(|(k, v)| TreeOp::Insert(k, v)),
        3 => (key_strategy(), value_strategy()).prop_map(|(k, v)| TreeOp::Remove(k, v)),
        1 => key_strategy().prop_map(TreeOp::RemoveKey),
        2 => key_strategy().prop_map(TreeOp::Get),
    ]
}

// ─── Randomized comparisons against BTreeMap<K, Vec<V>> ──────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Replays random operations on both the tree and a `BTreeMap` of sorted buckets
    /// and asserts identical results at every step.
    #[test]
    fn ops_match_bucketed_btreemap(
        branching_factor in MIN_BRANCHING_FACTOR..12,
        ops in proptest::collection::vec(tree_op_strategy(), TEST_SIZE),
    ) {
        let mut tree = tree(branching_factor);
        let mut model: BTreeMap<i32, Vec<i32>> = BTreeMap::new();

        for op in ops {
            match op {
                TreeOp::Insert(k, v) => {
                    tree.insert(k, v);
                    let bucket = model.entry(k).or_default();
                    let at = bucket.partition_point(|x| *x <= v);
                    bucket.insert(at, v);
                }
                TreeOp::Remove(k, v) => {
                    let expected = match model.get_mut(&k) {
                        Some(bucket) => match bucket.iter().position(|x| *x == v) {
                            Some(at) => {
                                bucket.remove(at);
                                if bucket.is_empty() {
                                    model.remove(&k);
                                }
                                true
                            }
                            None => false,
                        },
                        None => false,
                    };
                    prop_assert_eq!(tree.remove(&k, &v), expected);
                }
                TreeOp::RemoveKey(k) => {
                    prop_assert_eq!(tree.remove_key(&k), model.remove(&k).unwrap_or_default());
                }
                TreeOp::Get(k) => {
                    prop_assert_eq!(tree.get(&k), model.get(&k).map_or(&[][..], Vec::as_slice));
                    prop_assert_eq!(tree.contains_key(&k), model.contains_key(&k));
                }
            }
            prop_assert_eq!(tree.len(), model.values().map(Vec::len).sum::<usize>());
        }

        prop_assert_eq!(owned(tree.get_all(Order::Ascending)), flatten(&model));
        prop_assert_eq!(tree.key_count(), model.len());
        prop_assert_eq!(tree.first_key(), model.keys().next());
        prop_assert_eq!(tree.last_key(), model.keys().next_back());
        assert_well_formed(&tree.dump(), tree.config());
    }

    /// Inserting a multiset and removing it again in a different order leaves an empty
    /// single-leaf tree.
    #[test]
    fn insert_then_remove_everything(
        branching_factor in MIN_BRANCHING_FACTOR..8,
        entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..TEST_SIZE),
        seed in any::<u64>(),
    ) {
        let mut tree = tree(branching_factor);
        tree.extend(entries.iter().copied());
        prop_assert_eq!(tree.len(), entries.len());

        let mut order = entries.clone();
        // Deterministic shuffle so failures reproduce from the seed alone.
        let mut x = seed | 1;
        for i in (1..order.len()).rev() {
            x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let j = usize::try_from(x >> 33).unwrap_or(0) % (i + 1);
            order.swap(i, j);
        }
        for (k, v) in order {
            prop_assert!(tree.remove(&k, &v));
        }

        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.key_count(), 0);
        prop_assert_eq!(tree.height(), 1);
        prop_assert!(tree.get_all(Order::Ascending).is_empty());
    }

    /// The default range options select exactly the keys in `[lower, upper)`.
    #[test]
    fn range_matches_filtered_get_all(
        entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..TEST_SIZE),
        lower in -320i32..320,
        width in 0i32..200,
    ) {
        let tree: BPlusTree<i32, i32> = entries.iter().copied().collect();
        let upper = lower + width;

        let mut model: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for (k, v) in entries {
            model.entry(k).or_default().push(v);
        }
        for bucket in model.values_mut() {
            bucket.sort_unstable();
        }

        let expected: Vec<i32> = model.range(lower..upper).flat_map(|(_, bucket)| bucket.iter().copied()).collect();
        prop_assert_eq!(owned(tree.get_range(&lower, &upper, RangeOptions::new())), expected);

        let closed: Vec<i32> = model.range(lower..=upper).flat_map(|(_, bucket)| bucket.iter().copied()).collect();
        let options = RangeOptions::new().upper_inclusive(true);
        prop_assert_eq!(owned(tree.get_range(&lower, &upper, options)), closed);

        let open: Vec<i32> = model
            .range(lower..upper)
            .filter(|(k, _)| **k != lower)
            .flat_map(|(_, bucket)| bucket.iter().copied())
            .collect();
        let options = RangeOptions::new().lower_inclusive(false).order(Order::Descending);
        prop_assert_eq!(owned(tree.get_range(&lower, &upper, options)), open.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn iter_matches_get_all(entries in proptest::collection::vec((key_strategy(), value_strategy()), 0..TEST_SIZE)) {
        let tree: BPlusTree<i32, i32> = entries.iter().copied().collect();
        let iter = tree.iter();
        prop_assert_eq!(iter.len(), entries.len());

        let pairs: Vec<(i32, i32)> = iter.map(|(k, v)| (*k, *v)).collect();
        let mut expected = entries;
        expected.sort_unstable();
        prop_assert_eq!(pairs, expected);
    }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn ascending_inserts_grow_the_tree() {
    let mut tree = tree(4);
    for key in 1..=10 {
        tree.insert(key, key);
    }

    let dump = tree.dump();
    assert!(dump.height() >= 2);
    assert_eq!(tree.height(), dump.height());
    let chain: Vec<i32> = dump.leaves().iter().flat_map(|leaf| leaf.keys.clone()).collect();
    assert_eq!(chain, (1..=10).collect::<Vec<_>>());
    assert_well_formed(&dump, tree.config());
}

#[test]
fn removals_shrink_back_to_one_leaf() {
    let mut tree = tree(4);
    for key in 1..=10 {
        tree.insert(key, key);
    }
    for key in 1..=8 {
        assert_eq!(tree.remove_key(&key), vec![key]);
        assert_well_formed(&tree.dump(), tree.config());
    }

    let dump = tree.dump();
    assert!(dump.is_leaf());
    assert_eq!(dump.keys, vec![9, 10]);
    assert_eq!(owned(tree.get_all(Order::Ascending)), vec![9, 10]);
}

#[test]
fn equal_values_share_a_bucket() {
    init_tracing();
    let mut tree = BPlusTree::new();
    tree.insert(5, "a");
    tree.insert(5, "b");
    assert_eq!(tree.get(&5), &["a", "b"]);

    assert!(tree.remove(&5, &"a"));
    assert_eq!(tree.get(&5), &["b"]);
    assert!(tree.remove(&5, &"b"));
    assert!(tree.get(&5).is_empty());
    assert!(!tree.contains_key(&5));
}

#[test]
fn duplicate_values_are_kept() {
    let mut tree = tree(3);
    for _ in 0..5 {
        tree.insert(1, 7);
    }
    assert_eq!(tree.len(), 5);
    assert!(tree.remove(&1, &7));
    assert_eq!(tree.get(&1), &[7, 7, 7, 7]);
}

#[test]
fn empty_tree_queries() {
    let tree = tree(5);
    assert!(tree.get(&1).is_empty());
    assert!(tree.get_all(Order::Ascending).is_empty());
    assert!(tree.get_all(Order::Descending).is_empty());
    assert!(tree.get_range(&0, &100, RangeOptions::new().upper_inclusive(true)).is_empty());
    assert_eq!(tree.first_key(), None);
    assert_eq!(tree.iter().next(), None);

    let dump = tree.dump();
    assert!(dump.is_leaf());
    assert!(dump.keys.is_empty());
    assert_eq!((dump.prev, dump.next), (None, None));
}

#[test]
fn range_edges() {
    let tree: BPlusTree<i32, i32> = (0..50).map(|n| (n, n)).collect();
    assert!(tree.get_range(&10, &10, RangeOptions::new()).is_empty());
    assert_eq!(owned(tree.get_range(&10, &10, RangeOptions::new().upper_inclusive(true))), vec![10]);
    assert!(tree.get_range(&30, &20, RangeOptions::new().upper_inclusive(true)).is_empty());
    assert_eq!(owned(tree.get_range(&48, &100, RangeOptions::new())), vec![48, 49]);
    assert!(tree.get_range(&50, &100, RangeOptions::new()).is_empty());
    assert_eq!(owned(tree.get_range(&-10, &2, RangeOptions::new())), vec![0, 1]);
}

#[test]
fn string_keys_borrow_as_str() {
    init_tracing();
    let mut tree: BPlusTree<String, u32> = BPlusTree::with_branching_factor(3).expect("valid branching factor");
    for (i, word) in ["pear", "apple", "fig", "kiwi", "date", "lime"].iter().enumerate() {
        tree.insert((*word).to_string(), u32::try_from(i).unwrap());
    }
    assert_eq!(tree.get("fig"), &[2]);
    assert_eq!(tree.first_key().map(String::as_str), Some("apple"));
    assert_eq!(tree.get_range("date", "kiwi", RangeOptions::new()), [&4, &2]);
    assert_eq!(tree.remove_key("pear"), vec![0]);
    assert_eq!(tree.last_key().map(String::as_str), Some("lime"));
}

#[test]
fn node_ids_are_unique() {
    let mut tree = tree(3);
    for key in 0..100 {
        tree.insert(key, key);
    }
    for key in (0..100).step_by(3) {
        tree.remove_key(&key);
    }

    fn collect(node: &NodeDump<i32, i32>, ids: &mut Vec<u64>) {
        ids.push(node.id.get());
        for child in &node.children {
            collect(child, ids);
        }
    }
    let mut ids = Vec::new();
    collect(&tree.dump(), &mut ids);
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
}

#[test]
fn rejects_small_branching_factor() {
    let err = BPlusTree::<i32, i32>::with_branching_factor(2).map(|_| ()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::BranchingFactorTooSmall {
            branching_factor: 2,
            minimum: MIN_BRANCHING_FACTOR,
        }
    );
    assert!(err.to_string().contains("at least 3"));
}

#[test]
fn debug_formats_as_map() {
    let tree: BPlusTree<i32, char> = [(2, 'x'), (1, 'y'), (2, 'w')].into_iter().collect();
    assert_eq!(format!("{tree:?}"), "{1: ['y'], 2: ['w', 'x']}");
}
