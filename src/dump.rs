//! Structural snapshots of a tree for assertions and visualization.
//!
//! A [`NodeDump`] is a plain nested copy of the node graph. It is not part of the
//! stable contract of [`BPlusTree`](crate::BPlusTree) and its shape may change.

use alloc::vec::Vec;
use core::fmt;

use crate::raw::{Handle, Node, RawTree};

/// Identifier assigned to each node when it is created.
///
/// Ids are unique within one tree and only appear in dumps.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Snapshot of one node and its subtree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeDump<K, V> {
    pub id: NodeId,
    /// Keys of a leaf, or separator keys of an internal node.
    pub keys: Vec<K>,
    /// One bucket per key for a leaf; empty for an internal node.
    pub values: Vec<Vec<V>>,
    /// Previous leaf in the leaf chain.
    pub prev: Option<NodeId>,
    /// Next leaf in the leaf chain.
    pub next: Option<NodeId>,
    pub children: Vec<NodeDump<K, V>>,
}

impl<K, V> NodeDump<K, V> {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of levels in this subtree, counting the node itself.
    #[must_use]
    pub fn height(&self) -> usize {
        1 + self.children.first().map_or(0, NodeDump::height)
    }

    /// Leaves of this subtree from left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<&NodeDump<K, V>> {
        let mut leaves = Vec::new();
        let mut stack = alloc::vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                leaves.push(node);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }
}

impl<K: Clone, V: Clone> RawTree<K, V> {
    pub(crate) fn dump(&self) -> NodeDump<K, V> {
        self.dump_node(self.root())
    }

    fn dump_node(&self, handle: Handle) -> NodeDump<K, V> {
        match self.node(handle) {
            Node::Leaf(leaf) => NodeDump {
                id: leaf.id(),
                keys: leaf.keys().to_vec(),
                values: leaf.buckets().iter().map(|bucket| bucket.to_vec()).collect(),
                prev: leaf.prev().map(|prev| self.node(prev).id()),
                next: leaf.next().map(|next| self.node(next).id()),
                children: Vec::new(),
            },
            Node::Internal(internal) => NodeDump {
                id: internal.id(),
                keys: internal.keys().to_vec(),
                values: Vec::new(),
                prev: None,
                next: None,
                children: internal.children().iter().map(|&child| self.dump_node(child)).collect(),
            },
        }
    }
}
