use alloc::vec::Vec;
use core::borrow::Borrow;

use smallvec::{SmallVec, smallvec};

use super::handle::Handle;
use crate::dump::NodeId;
use crate::search::{self, SearchResult};

/// Ordered values stored under one leaf key. Most keys carry a single value.
pub(crate) type Bucket<V> = SmallVec<[V; 1]>;

pub(crate) enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

// B+Tree: Internal nodes store separator keys and child handles.
pub(crate) struct InternalNode<K> {
    id: NodeId,
    parent: Option<Handle>,
    // keys[i] is the minimum key reachable under children[i + 1].
    keys: Vec<K>,
    children: Vec<Handle>,
}

// B+Tree: Leaf nodes store keys and their value buckets.
pub(crate) struct LeafNode<K, V> {
    id: NodeId,
    parent: Option<Handle>,
    prev: Option<Handle>,
    next: Option<Handle>,
    keys: Vec<K>,
    buckets: Vec<Bucket<V>>,
}

/// What [`LeafNode::remove_value`] took out of a leaf.
pub(crate) struct Removal<K, V> {
    /// Position of the key the values were removed from.
    pub(crate) key_index: usize,
    /// The key itself, if its bucket became empty and the entry was deleted.
    pub(crate) deleted_key: Option<K>,
    pub(crate) values: Bucket<V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Number of keys: data keys for a leaf, separators for an internal node.
    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.keys.len(),
            Node::Leaf(leaf) => leaf.keys.len(),
        }
    }

    pub(crate) fn keys(&self) -> &[K] {
        match self {
            Node::Internal(internal) => &internal.keys,
            Node::Leaf(leaf) => &leaf.keys,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        match self {
            Node::Internal(internal) => internal.id,
            Node::Leaf(leaf) => leaf.id,
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }
}

impl<K> InternalNode<K> {
    /// Creates an internal node over `children`, separated by `keys`.
    pub(crate) fn new(id: NodeId, keys: Vec<K>, children: Vec<Handle>) -> Self {
        debug_assert_eq!(children.len(), keys.len() + 1);
        Self {
            id,
            parent: None,
            keys,
            children,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Position of `child` in this node's child list.
    pub(crate) fn position_of(&self, child: Handle) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Returns the index of the child whose subtree may contain `key`.
    ///
    /// A separator is the inclusive lower bound of the child to its right, so an
    /// exact match descends right of it.
    #[inline]
    pub(crate) fn child_index_for<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match search::search(&self.keys, key) {
            SearchResult::Found(idx) => idx + 1,
            SearchResult::NotFound(idx) => idx,
        }
    }

    pub(crate) fn set_key(&mut self, index: usize, key: K) {
        self.keys[index] = key;
    }

    /// Replaces every separator with `keys`. Used after the children changed wholesale.
    pub(crate) fn set_keys(&mut self, keys: Vec<K>) {
        debug_assert_eq!(keys.len() + 1, self.children.len());
        self.keys = keys;
    }

    /// Inserts `child` right after position `index`, with `key` as its separator.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Removes the child at `index`, dropping the separator in front of it (or the
    /// one after it for the first child).
    pub(crate) fn remove_child(&mut self, index: usize) -> Handle {
        let child = self.children.remove(index);
        if !self.keys.is_empty() {
            self.keys.remove(index.saturating_sub(1));
        }
        child
    }

    /// Pushes a separator and child to the end.
    pub(crate) fn push_child(&mut self, key: K, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    /// Pushes a child to the front; `key` separates it from the old first child.
    pub(crate) fn push_child_front(&mut self, key: K, child: Handle) {
        self.keys.insert(0, key);
        self.children.insert(0, child);
    }

    /// Pops the last child and the separator in front of it.
    pub(crate) fn pop_child(&mut self) -> Option<(K, Handle)> {
        let key = self.keys.pop()?;
        let child = self.children.pop()?;
        Some((key, child))
    }

    /// Pops the first child and the separator after it.
    pub(crate) fn pop_child_front(&mut self) -> Option<(K, Handle)> {
        if self.keys.is_empty() {
            return None;
        }
        let key = self.keys.remove(0);
        let child = self.children.remove(0);
        Some((key, child))
    }

    /// Splits at `split_point`: keys after it and their children move to a new right
    /// node, and the key at `split_point` is returned for promotion into the parent.
    pub(crate) fn split_off(&mut self, split_point: usize, right_id: NodeId) -> (K, InternalNode<K>) {
        let keys: Vec<K> = self.keys.drain(split_point + 1..).collect();
        let children: Vec<Handle> = self.children.drain(split_point + 1..).collect();
        let median = self.keys.pop().expect("`InternalNode::split_off()` - split point out of range");

        let mut right = InternalNode::new(right_id, keys, children);
        right.parent = self.parent;
        (median, right)
    }

    /// Appends a right sibling's children, using `separator` as the key between the halves.
    pub(crate) fn merge_with_right(&mut self, separator: K, mut right: InternalNode<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            prev: None,
            next: None,
            keys: Vec::new(),
            buckets: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn bucket(&self, index: usize) -> &[V] {
        &self.buckets[index]
    }

    pub(crate) fn buckets(&self) -> &[Bucket<V>] {
        &self.buckets
    }

    /// Returns the bucket stored under `key`, or an empty slice.
    pub(crate) fn lookup<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match search::search(&self.keys, key) {
            SearchResult::Found(idx) => &self.buckets[idx],
            SearchResult::NotFound(_) => &[],
        }
    }

    /// Adds `value` under `key`, creating the key if needed.
    ///
    /// Buckets stay sorted; a value equal to existing ones goes after them.
    pub(crate) fn insert_value(&mut self, key: K, value: V)
    where
        K: Ord,
        V: Ord,
    {
        match search::search(&self.keys, &key) {
            SearchResult::Found(idx) => {
                let bucket = &mut self.buckets[idx];
                let at = search::upper_bound(bucket.as_slice(), &value);
                bucket.insert(at, value);
            }
            SearchResult::NotFound(idx) => {
                self.keys.insert(idx, key);
                self.buckets.insert(idx, smallvec![value]);
            }
        }
    }

    /// Removes one `value` from the bucket of `key`, or the whole bucket when
    /// `value` is `None`. Returns `None` if nothing matched.
    pub(crate) fn remove_value<Q>(&mut self, key: &Q, value: Option<&V>) -> Option<Removal<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        V: Ord,
    {
        let SearchResult::Found(key_index) = search::search(&self.keys, key) else {
            return None;
        };

        let values = match value {
            None => core::mem::take(&mut self.buckets[key_index]),
            Some(value) => {
                let bucket = &mut self.buckets[key_index];
                let SearchResult::Found(at) = search::search(bucket.as_slice(), value) else {
                    return None;
                };
                smallvec![bucket.remove(at)]
            }
        };

        let deleted_key = if self.buckets[key_index].is_empty() {
            self.buckets.remove(key_index);
            Some(self.keys.remove(key_index))
        } else {
            None
        };

        Some(Removal {
            key_index,
            deleted_key,
            values,
        })
    }

    /// Pushes an entry to the end.
    pub(crate) fn push(&mut self, key: K, bucket: Bucket<V>) {
        self.keys.push(key);
        self.buckets.push(bucket);
    }

    /// Pushes an entry to the front.
    pub(crate) fn push_front(&mut self, key: K, bucket: Bucket<V>) {
        self.keys.insert(0, key);
        self.buckets.insert(0, bucket);
    }

    /// Pops the last entry.
    pub(crate) fn pop(&mut self) -> Option<(K, Bucket<V>)> {
        let key = self.keys.pop()?;
        let bucket = self.buckets.pop()?;
        Some((key, bucket))
    }

    /// Pops the first entry.
    pub(crate) fn pop_front(&mut self) -> Option<(K, Bucket<V>)> {
        if self.keys.is_empty() {
            return None;
        }
        Some((self.keys.remove(0), self.buckets.remove(0)))
    }

    /// Splits at `split_point`: entries from it onwards move to a new right leaf
    /// that shares this leaf's parent. Sibling links are left to the caller.
    pub(crate) fn split_off(&mut self, split_point: usize, right_id: NodeId) -> LeafNode<K, V> {
        let mut right = LeafNode::new(right_id);
        right.parent = self.parent;
        right.keys = self.keys.split_off(split_point);
        right.buckets = self.buckets.split_off(split_point);
        right
    }

    /// Appends a right sibling's entries and takes over its `next` link.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K, V>) {
        self.keys.append(&mut right.keys);
        self.buckets.append(&mut right.buckets);
        self.next = right.next;
    }
}
