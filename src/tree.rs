use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use tracing::debug;

use crate::config::Config;
use crate::dump::NodeDump;
use crate::error::ConfigError;
use crate::raw::{Cursor, RawTree};

/// Direction in which a scan returns its values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Options for [`BPlusTree::get_range`].
///
/// The default is the half-open interval `[lower, upper)` in ascending order.
///
/// # Examples
///
/// ```
/// use bucket_tree::{Order, RangeOptions};
///
/// let closed = RangeOptions::new().upper_inclusive(true).order(Order::Descending);
/// assert!(closed.is_lower_inclusive());
/// assert!(closed.is_upper_inclusive());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeOptions {
    lower_inclusive: bool,
    upper_inclusive: bool,
    order: Order,
}

impl RangeOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lower_inclusive: true,
            upper_inclusive: false,
            order: Order::Ascending,
        }
    }

    #[must_use]
    pub const fn lower_inclusive(mut self, inclusive: bool) -> Self {
        self.lower_inclusive = inclusive;
        self
    }

    #[must_use]
    pub const fn upper_inclusive(mut self, inclusive: bool) -> Self {
        self.upper_inclusive = inclusive;
        self
    }

    #[must_use]
    pub const fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    #[must_use]
    pub const fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    #[must_use]
    pub const fn sort_order(&self) -> Order {
        self.order
    }
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered multimap based on a [B+Tree].
///
/// Every key owns a *bucket*: a non-empty, sorted list of values. Inserting a value
/// under an existing key adds it to that key's bucket instead of replacing anything,
/// and a key disappears once its bucket is empty. Values live only in the leaves,
/// which are chained left to right so scans never climb back up the tree.
///
/// The branching factor `B` is fixed at construction (see [`Config`]). Every node
/// holds at most `B - 1` keys; nodes that overflow split and nodes that underflow
/// borrow from or merge with a sibling, so all leaves stay at the same depth.
///
/// # Examples
///
/// ```
/// use bucket_tree::{BPlusTree, Order};
///
/// let mut index = BPlusTree::new();
/// index.insert("rust", 3);
/// index.insert("go", 1);
/// index.insert("rust", 1);
///
/// assert_eq!(index.get("rust"), &[1, 3]);
/// assert_eq!(index.len(), 3);
/// assert_eq!(index.key_count(), 2);
/// assert_eq!(index.get_all(Order::Ascending), [&1, &1, &3]);
///
/// assert!(index.remove("rust", &1));
/// assert_eq!(index.remove_key("rust"), [3]);
/// assert!(!index.contains_key("rust"));
/// ```
///
/// [B+Tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct BPlusTree<K, V> {
    raw: RawTree<K, V>,
    config: Config,
}

impl<K, V> BPlusTree<K, V> {
    /// Makes a new, empty tree with the [default branching factor](crate::DEFAULT_BRANCHING_FACTOR).
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::BPlusTree;
    ///
    /// let tree: BPlusTree<u32, &str> = BPlusTree::new();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.height(), 1);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(Config::new())
    }

    /// Makes a new, empty tree using `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` does not pass [`Config::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::{BPlusTree, Config};
    ///
    /// let tree = BPlusTree::<i32, i32>::with_config(Config::new().with_branching_factor(4));
    /// assert!(tree.is_ok());
    ///
    /// let tree = BPlusTree::<i32, i32>::with_config(Config::new().with_branching_factor(1));
    /// assert!(tree.is_err());
    /// ```
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Shorthand for [`BPlusTree::with_config`] with only the branching factor set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BranchingFactorTooSmall`] if `branching_factor` is below
    /// [`MIN_BRANCHING_FACTOR`](crate::MIN_BRANCHING_FACTOR).
    pub fn with_branching_factor(branching_factor: usize) -> Result<Self, ConfigError> {
        Self::with_config(Config::new().with_branching_factor(branching_factor))
    }

    fn from_valid_config(config: Config) -> Self {
        debug!(branching_factor = config.branching_factor(), "created tree");
        Self {
            raw: RawTree::new(config.bounds()),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of values in the tree, counting every value of every bucket.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns the number of distinct keys.
    ///
    /// # Complexity
    ///
    /// O(n) over the leaves.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.raw.key_count()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels, counting the root and the leaves. An empty tree has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Removes every key and value, keeping the configuration.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the smallest key.
    #[must_use]
    pub fn first_key(&self) -> Option<&K> {
        self.raw.node(self.raw.first_leaf()).keys().first()
    }

    /// Returns the largest key.
    #[must_use]
    pub fn last_key(&self) -> Option<&K> {
        self.raw.node(self.raw.last_leaf()).keys().last()
    }

    /// Iterates over `(key, value)` pairs in ascending key order, yielding each value
    /// of a bucket in turn.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::BPlusTree;
    ///
    /// let tree: BPlusTree<_, _> = [(2, 'b'), (1, 'a'), (2, 'a')].into_iter().collect();
    /// let pairs: Vec<_> = tree.iter().collect();
    /// assert_eq!(pairs, [(&1, &'a'), (&2, &'a'), (&2, &'b')]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: &self.raw,
            cursor: self.raw.first_cursor(),
            slot: 0,
            remaining: self.raw.len(),
        }
    }

    /// Every value in the tree, ordered by key and then by value.
    ///
    /// # Complexity
    ///
    /// O(n), walking the leaf chain.
    #[must_use]
    pub fn get_all(&self, order: Order) -> Vec<&V> {
        let mut values = self.raw.values();
        if order == Order::Descending {
            values.reverse();
        }
        values
    }
}

impl<K: Ord, V> BPlusTree<K, V> {
    /// Returns the bucket stored under `key`, or an empty slice if the key is absent.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::BPlusTree;
    ///
    /// let mut tree = BPlusTree::new();
    /// tree.insert(5, "b");
    /// tree.insert(5, "a");
    /// assert_eq!(tree.get(&5), &["a", "b"]);
    /// assert!(tree.get(&6).is_empty());
    /// ```
    pub fn get<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        !self.raw.get(key).is_empty()
    }

    /// Values whose keys lie between `lower` and `upper`, bounded as `options` says.
    ///
    /// An empty result is returned when `lower` is above `upper`.
    ///
    /// # Complexity
    ///
    /// O(log n + m) for m values returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::{BPlusTree, Order, RangeOptions};
    ///
    /// let tree: BPlusTree<i32, i32> = (0..10).map(|n| (n, n * 10)).collect();
    /// assert_eq!(tree.get_range(&2, &5, RangeOptions::new()), [&20, &30, &40]);
    ///
    /// let options = RangeOptions::new().lower_inclusive(false).upper_inclusive(true).order(Order::Descending);
    /// assert_eq!(tree.get_range(&2, &5, options), [&50, &40, &30]);
    /// ```
    pub fn get_range<Q>(&self, lower: &Q, upper: &Q, options: RangeOptions) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut values = self.raw.range(lower, upper, options.lower_inclusive, options.upper_inclusive);
        if options.order == Order::Descending {
            values.reverse();
        }
        values
    }
}

impl<K: Ord + Clone, V: Ord> BPlusTree<K, V> {
    /// Adds `value` to the bucket of `key`, creating the key if it is new.
    ///
    /// Equal values are all kept; each is placed after the ones already present.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) {
        self.raw.insert(key, value);
    }

    /// Removes one occurrence of `value` from the bucket of `key`. The key itself is
    /// removed with its last value.
    ///
    /// Returns whether a value was removed.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        !self.raw.remove(key, Some(value)).is_empty()
    }

    /// Removes `key` and returns its whole bucket, which is empty if the key was absent.
    pub fn remove_key<Q>(&mut self, key: &Q) -> Vec<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key, None).into_vec()
    }
}

impl<K: Clone, V: Clone> BPlusTree<K, V> {
    /// Returns a structural snapshot of the whole tree, for tests and debugging.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_tree::BPlusTree;
    ///
    /// let mut tree = BPlusTree::with_branching_factor(3).unwrap();
    /// for n in 0..4 {
    ///     tree.insert(n, n);
    /// }
    /// let dump = tree.dump();
    /// assert!(!dump.is_leaf());
    /// let keys: Vec<i32> = dump.leaves().iter().flat_map(|leaf| leaf.keys.clone()).collect();
    /// assert_eq!(keys, [0, 1, 2, 3]);
    /// ```
    #[must_use]
    pub fn dump(&self) -> NodeDump<K, V> {
        self.raw.dump()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BPlusTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut cursor = self.raw.first_cursor();
        while let Some(at) = cursor {
            let (key, bucket) = self.raw.entry(at);
            map.entry(key, &bucket);
            cursor = self.raw.step_forward(at);
        }
        map.finish()
    }
}

impl<K, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Ord> FromIterator<(K, V)> for BPlusTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = BPlusTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord + Clone, V: Ord> Extend<(K, V)> for BPlusTree<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// An iterator over the `(key, value)` pairs of a [`BPlusTree`].
///
/// This `struct` is created by the [`iter`](BPlusTree::iter) method.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: &'a RawTree<K, V>,
    cursor: Option<Cursor>,
    // Position inside the current bucket.
    slot: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor?;
        let tree = self.tree;
        let (key, bucket) = tree.entry(cursor);
        let value = &bucket[self.slot];

        self.slot += 1;
        if self.slot == bucket.len() {
            self.slot = 0;
            self.cursor = tree.step_forward(cursor);
        }
        self.remaining -= 1;
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            cursor: self.cursor,
            slot: self.slot,
            remaining: self.remaining,
        }
    }
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}
