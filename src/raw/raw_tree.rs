use alloc::vec;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;

use tracing::{debug, trace};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Bucket, InternalNode, LeafNode, Node};
use crate::config::Bounds;
use crate::dump::NodeId;
use crate::search::{self, SearchResult};

/// A position in the leaf chain: a leaf and the index of one of its keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Cursor {
    pub(crate) leaf: Handle,
    pub(crate) index: usize,
}

/// The core B+Tree implementation backing `BPlusTree`.
pub(crate) struct RawTree<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node. An empty tree has an empty leaf root.
    root: Handle,
    bounds: Bounds,
    /// Total number of values across all buckets.
    len: usize,
    /// Id handed to the next node created.
    next_id: u64,
}

impl<K, V> RawTree<K, V> {
    /// Creates a new, empty tree.
    pub(crate) fn new(bounds: Bounds) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(LeafNode::new(NodeId::new(0))));
        Self {
            nodes,
            root,
            bounds,
            len: 0,
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Returns the number of values in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of distinct keys, walking the leaf chain.
    pub(crate) fn key_count(&self) -> usize {
        let mut count = 0;
        let mut current = Some(self.first_leaf());
        while let Some(handle) = current {
            let leaf = self.nodes.get(handle).as_leaf();
            count += leaf.key_count();
            current = leaf.next();
        }
        count
    }

    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    /// Number of levels from the root down to the leaves.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
            height += 1;
        }
        height
    }

    /// Drops every node and starts over with an empty leaf root.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        let id = self.allocate_id();
        self.root = self.nodes.alloc(Node::Leaf(LeafNode::new(id)));
        self.len = 0;
    }

    /// Returns the leftmost leaf.
    pub(crate) fn first_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
        }
        current
    }

    /// Returns the rightmost leaf.
    pub(crate) fn last_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.child_count() - 1);
        }
        current
    }

    /// Returns the position of the smallest key, if the tree has any.
    pub(crate) fn first_cursor(&self) -> Option<Cursor> {
        let leaf = self.first_leaf();
        (self.nodes.get(leaf).key_count() > 0).then_some(Cursor { leaf, index: 0 })
    }

    /// Returns the position after `cursor`, following the leaf chain across leaves.
    ///
    /// A cursor whose index is past the end of its leaf moves to the first key of the
    /// next leaf.
    pub(crate) fn step_forward(&self, cursor: Cursor) -> Option<Cursor> {
        let leaf = self.nodes.get(cursor.leaf).as_leaf();
        if cursor.index + 1 < leaf.key_count() {
            return Some(Cursor {
                leaf: cursor.leaf,
                index: cursor.index + 1,
            });
        }
        leaf.next().map(|next| Cursor { leaf: next, index: 0 })
    }

    /// Returns the key and bucket at `cursor`.
    pub(crate) fn entry(&self, cursor: Cursor) -> (&K, &[V]) {
        let leaf = self.nodes.get(cursor.leaf).as_leaf();
        (leaf.key(cursor.index), leaf.bucket(cursor.index))
    }

    /// Every value in ascending key order, walking the leaf chain.
    pub(crate) fn values(&self) -> Vec<&V> {
        let mut values = Vec::with_capacity(self.len);
        let mut current = Some(self.first_leaf());
        while let Some(handle) = current {
            let leaf = self.nodes.get(handle).as_leaf();
            for bucket in leaf.buckets() {
                values.extend(bucket.iter());
            }
            current = leaf.next();
        }
        values
    }

    /// Returns the smallest key in the subtree rooted at `handle`.
    fn minimum_key(&self, handle: Handle) -> Option<&K> {
        let mut current = handle;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => current = internal.child(0),
                Node::Leaf(leaf) => return leaf.keys().first(),
            }
        }
    }

    /// Points every child of `handle` back at it.
    fn reparent_children(&mut self, handle: Handle) {
        let Node::Internal(internal) = self.nodes.get(handle) else {
            return;
        };
        let children = internal.children().to_vec();
        for child in children {
            self.nodes.get_mut(child).set_parent(Some(handle));
        }
    }

    fn child_position(&self, parent: Handle, child: Handle) -> usize {
        self.nodes
            .get(parent)
            .as_internal()
            .position_of(child)
            .expect("`RawTree::child_position()` - child is not linked from its parent")
    }

    /// Links `right` into the leaf chain immediately after `left`.
    fn link_after(&mut self, left: Handle, right: Handle) {
        let old_next = self.nodes.get(left).as_leaf().next();

        let right_leaf = self.nodes.get_mut(right).as_leaf_mut();
        right_leaf.set_prev(Some(left));
        right_leaf.set_next(old_next);

        self.nodes.get_mut(left).as_leaf_mut().set_next(Some(right));
        if let Some(old_next) = old_next {
            self.nodes.get_mut(old_next).as_leaf_mut().set_prev(Some(right));
        }
    }
}

impl<K: Ord, V> RawTree<K, V> {
    /// Walks from the root to the leaf whose key range covers `key`.
    pub(crate) fn descend_to_leaf<Q>(&self, key: &Q) -> Handle
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => current = internal.child(internal.child_index_for(key)),
                Node::Leaf(_) => return current,
            }
        }
    }

    /// Returns the bucket for `key`, or an empty slice.
    pub(crate) fn get<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nodes.get(self.descend_to_leaf(key)).as_leaf().lookup(key)
    }

    /// Values whose keys fall between `lower` and `upper`, in ascending key order.
    pub(crate) fn range<Q>(&self, lower: &Q, upper: &Q, lower_inclusive: bool, upper_inclusive: bool) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut values = Vec::new();

        let leaf = self.descend_to_leaf(lower);
        let start = search::search(self.nodes.get(leaf).keys(), lower);
        let at = Cursor {
            leaf,
            index: start.index(),
        };
        let mut cursor = if start.index() >= self.nodes.get(leaf).key_count() {
            self.step_forward(at)
        } else if start.is_found() && !lower_inclusive {
            self.step_forward(at)
        } else {
            Some(at)
        };

        while let Some(at) = cursor {
            let (key, bucket) = self.entry(at);
            match Ord::cmp(key.borrow(), upper) {
                Ordering::Less => {
                    values.extend(bucket.iter());
                    cursor = self.step_forward(at);
                }
                Ordering::Equal => {
                    if upper_inclusive {
                        values.extend(bucket.iter());
                    }
                    break;
                }
                Ordering::Greater => break,
            }
        }
        values
    }
}

impl<K: Ord + Clone, V: Ord> RawTree<K, V> {
    /// Adds `value` under `key`, splitting nodes on the way up as needed.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        let leaf = self.descend_to_leaf(&key);
        self.nodes.get_mut(leaf).as_leaf_mut().insert_value(key, value);
        self.len += 1;
        self.split_propagate(leaf);
    }

    /// Removes one `value` from `key`'s bucket, or the whole bucket when `value` is
    /// `None`, then rebalances. Returns the removed values.
    pub(crate) fn remove<Q>(&mut self, key: &Q, value: Option<&V>) -> Bucket<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let leaf = self.descend_to_leaf(key);
        let Some(removal) = self.nodes.get_mut(leaf).as_leaf_mut().remove_value(key, value) else {
            return Bucket::new();
        };
        self.len -= removal.values.len();

        if let Some(old_first) = removal.deleted_key
            && removal.key_index == 0
        {
            self.replace_leaf_minimum(leaf, &old_first);
        }
        self.merge_propagate(leaf);
        removal.values
    }

    /// Rewrites the ancestor separator that mirrored a leaf's deleted first key.
    fn replace_leaf_minimum(&mut self, leaf_handle: Handle, old_first: &K) {
        let leaf = self.nodes.get(leaf_handle).as_leaf();
        let Some(parent) = leaf.parent() else {
            return;
        };
        // An emptied leaf is about to be refilled or merged away; its successor's
        // first key stands in until then.
        let replacement = leaf
            .keys()
            .first()
            .or_else(|| leaf.next().and_then(|next| self.nodes.get(next).keys().first()))
            .cloned();
        if let Some(new_first) = replacement {
            self.propagate_key_replace(parent, old_first, &new_first);
        }
    }

    /// Replaces `old_key` with `new_key` wherever it appears as a separator from
    /// `start` up to the root.
    fn propagate_key_replace(&mut self, start: Handle, old_key: &K, new_key: &K) {
        let mut current = Some(start);
        while let Some(handle) = current {
            let node = self.nodes.get_mut(handle);
            if let Node::Internal(internal) = node
                && let SearchResult::Found(index) = search::search(internal.keys(), old_key)
            {
                internal.set_key(index, new_key.clone());
            }
            current = node.parent();
        }
    }

    /// Recomputes the separators of an internal node from its children's minima.
    fn refresh_separators(&mut self, handle: Handle) {
        let Node::Internal(internal) = self.nodes.get(handle) else {
            return;
        };
        let keys: Vec<K> = internal.children()[1..]
            .iter()
            .filter_map(|&child| self.minimum_key(child).cloned())
            .collect();
        self.nodes.get_mut(handle).as_internal_mut().set_keys(keys);
    }

    /// Splits `handle` while it overflows, promoting a separator each time, up to
    /// and possibly including the root.
    fn split_propagate(&mut self, mut handle: Handle) {
        loop {
            let size = self.nodes.get(handle).key_count();
            if size <= self.bounds.max_keys {
                return;
            }
            let split_point = size / 2;
            let right_id = self.allocate_id();

            let (separator, right) = match self.nodes.get_mut(handle) {
                Node::Leaf(leaf) => {
                    let right = leaf.split_off(split_point, right_id);
                    (right.key(0).clone(), Node::Leaf(right))
                }
                Node::Internal(internal) => {
                    let (median, right) = internal.split_off(split_point, right_id);
                    (median, Node::Internal(right))
                }
            };
            let is_leaf = right.is_leaf();
            let right = self.nodes.alloc(right);
            if is_leaf {
                self.link_after(handle, right);
            } else {
                self.reparent_children(right);
            }
            trace!(
                left = %self.nodes.get(handle).id(),
                right = %right_id,
                leaf = is_leaf,
                split_point,
                "split node"
            );

            match self.nodes.get(handle).parent() {
                Some(parent) => {
                    let position = self.child_position(parent, handle);
                    self.nodes.get_mut(parent).as_internal_mut().insert_child(position, separator, right);
                    handle = parent;
                }
                None => {
                    self.grow_root(handle, separator, right);
                    return;
                }
            }
        }
    }

    /// Puts a new internal root above the two halves of the old one.
    fn grow_root(&mut self, left: Handle, separator: K, right: Handle) {
        let id = self.allocate_id();
        let root = self.nodes.alloc(Node::Internal(InternalNode::new(id, vec![separator], vec![left, right])));
        self.nodes.get_mut(left).set_parent(Some(root));
        self.nodes.get_mut(right).set_parent(Some(root));
        self.root = root;
        debug!(height = self.height(), root = %id, "tree grew");
    }

    /// Rebalances `handle` and its ancestors after a removal.
    ///
    /// An underflowing node first borrows from its left sibling, then from its right
    /// sibling, and otherwise merges with one of them.
    fn merge_propagate(&mut self, mut handle: Handle) {
        loop {
            let node = self.nodes.get(handle);
            let Some(parent) = node.parent() else {
                self.collapse_root();
                return;
            };
            if node.key_count() >= self.bounds.min_keys(node.is_leaf()) {
                return;
            }

            let position = self.child_position(parent, handle);
            let siblings = self.nodes.get(parent).as_internal();
            let left = position.checked_sub(1).map(|index| siblings.child(index));
            let right = (position + 1 < siblings.child_count()).then(|| siblings.child(position + 1));

            if let Some(left) = left
                && self.can_lend(left)
            {
                self.rotate_from_left(handle, left, parent, position);
            } else if let Some(right) = right
                && self.can_lend(right)
            {
                self.rotate_from_right(handle, right, parent, position);
            } else if let Some(left) = left {
                self.merge_siblings(left, handle, parent, position);
            } else if let Some(right) = right {
                self.merge_siblings(handle, right, parent, position + 1);
            }
            handle = parent;
        }
    }

    fn can_lend(&self, handle: Handle) -> bool {
        let node = self.nodes.get(handle);
        node.key_count() > self.bounds.min_keys(node.is_leaf())
    }

    /// Moves the last entry of the left sibling to the front of `handle`.
    fn rotate_from_left(&mut self, handle: Handle, left: Handle, parent: Handle, position: usize) {
        if self.nodes.get(handle).is_leaf() {
            let (key, bucket) = self.nodes.get_mut(left).as_leaf_mut().pop().expect("lending leaf is non-empty");
            self.nodes.get_mut(parent).as_internal_mut().set_key(position - 1, key.clone());
            self.nodes.get_mut(handle).as_leaf_mut().push_front(key, bucket);
        } else {
            // The old separator becomes the key between the moved child and our old first child.
            let separator = self.nodes.get(parent).as_internal().key(position - 1).clone();
            let (key, child) =
                self.nodes.get_mut(left).as_internal_mut().pop_child().expect("lending node has children");
            self.nodes.get_mut(handle).as_internal_mut().push_child_front(separator, child);
            self.nodes.get_mut(child).set_parent(Some(handle));
            self.nodes.get_mut(parent).as_internal_mut().set_key(position - 1, key);
        }
        trace!(
            node = %self.nodes.get(handle).id(),
            from = %self.nodes.get(left).id(),
            "borrowed from left sibling"
        );
    }

    /// Moves the first entry of the right sibling to the back of `handle`.
    fn rotate_from_right(&mut self, handle: Handle, right: Handle, parent: Handle, position: usize) {
        if self.nodes.get(handle).is_leaf() {
            let right_leaf = self.nodes.get_mut(right).as_leaf_mut();
            let (key, bucket) = right_leaf.pop_front().expect("lending leaf is non-empty");
            let right_first = right_leaf.key(0).clone();

            let was_empty = self.nodes.get(handle).key_count() == 0;
            let separators = self.nodes.get_mut(parent).as_internal_mut();
            separators.set_key(position, right_first);
            if was_empty && position > 0 {
                separators.set_key(position - 1, key.clone());
            }
            self.nodes.get_mut(handle).as_leaf_mut().push(key, bucket);
        } else {
            let separator = self.nodes.get(parent).as_internal().key(position).clone();
            let (key, child) =
                self.nodes.get_mut(right).as_internal_mut().pop_child_front().expect("lending node has children");
            self.nodes.get_mut(handle).as_internal_mut().push_child(separator, child);
            self.nodes.get_mut(child).set_parent(Some(handle));
            self.nodes.get_mut(parent).as_internal_mut().set_key(position, key);
        }
        trace!(
            node = %self.nodes.get(handle).id(),
            from = %self.nodes.get(right).id(),
            "borrowed from right sibling"
        );
    }

    /// Absorbs `right` into its left neighbour `left` and unlinks it from `parent`,
    /// where it sits at `right_position`.
    fn merge_siblings(&mut self, left: Handle, right: Handle, parent: Handle, right_position: usize) {
        let absorbed = self.nodes.get(right).id();
        match self.nodes.take(right) {
            Node::Leaf(right_leaf) => {
                let survivor = self.nodes.get_mut(left).as_leaf_mut();
                survivor.merge_with_right(right_leaf);
                if let Some(next) = survivor.next() {
                    self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(left));
                }
            }
            Node::Internal(right_internal) => {
                let separator = self.nodes.get(parent).as_internal().key(right_position - 1).clone();
                self.nodes.get_mut(left).as_internal_mut().merge_with_right(separator, right_internal);
                self.reparent_children(left);
            }
        }
        self.nodes.get_mut(parent).as_internal_mut().remove_child(right_position);
        self.refresh_separators(parent);
        trace!(
            survivor = %self.nodes.get(left).id(),
            absorbed = %absorbed,
            "merged siblings"
        );
    }

    /// Replaces an internal root that is left with a single child by that child.
    fn collapse_root(&mut self) {
        let root = self.root;
        let Node::Internal(internal) = self.nodes.get(root) else {
            return;
        };
        if internal.child_count() != 1 {
            return;
        }
        let child = internal.child(0);
        self.nodes.free(root);
        self.nodes.get_mut(child).set_parent(None);
        self.root = child;
        self.refresh_separators(child);
        debug!(height = self.height(), root = %self.nodes.get(child).id(), "tree shrank");
    }
}
