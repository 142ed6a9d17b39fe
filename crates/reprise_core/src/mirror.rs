//! Mirror between recorded node ids and tree nodes.

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::dom::{subtree, DomTree};
use crate::events::NodeId;

/// Bidirectional map `NodeId <-> N`.
///
/// Rebuilt from scratch on every full snapshot and kept current by
/// mutation application. One mirror per tree.
#[derive(Debug, Clone)]
pub struct Mirror<N> {
    id_to_node: FxHashMap<NodeId, N>,
    node_to_id: FxHashMap<N, NodeId>,
}

impl<N: Copy + Eq + Hash> Mirror<N> {
    pub fn new() -> Self {
        Self {
            id_to_node: FxHashMap::default(),
            node_to_id: FxHashMap::default(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<N> {
        self.id_to_node.get(&id).copied()
    }

    pub fn id_of(&self, node: N) -> Option<NodeId> {
        self.node_to_id.get(&node).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_to_node.contains_key(&id)
    }

    /// Map `id` to `node`, dropping any stale pairing of either side.
    pub fn insert(&mut self, id: NodeId, node: N) {
        if let Some(old_node) = self.id_to_node.insert(id, node) {
            if old_node != node {
                self.node_to_id.remove(&old_node);
            }
        }
        if let Some(old_id) = self.node_to_id.insert(node, id) {
            if old_id != id {
                self.id_to_node.remove(&old_id);
            }
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<N> {
        let node = self.id_to_node.remove(&id)?;
        self.node_to_id.remove(&node);
        Some(node)
    }

    pub fn remove_node(&mut self, node: N) -> Option<NodeId> {
        let id = self.node_to_id.remove(&node)?;
        self.id_to_node.remove(&id);
        Some(id)
    }

    /// Forget `node` and every descendant of it in `tree`.
    pub fn remove_subtree<T>(&mut self, tree: &T, node: N) -> usize
    where
        T: DomTree<Node = N> + ?Sized,
    {
        subtree(tree, node)
            .into_iter()
            .filter(|&n| self.remove_node(n).is_some())
            .count()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.id_to_node.clear();
        self.node_to_id.clear();
    }

    pub fn len(&self) -> usize {
        self.id_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_node.is_empty()
    }

    /// Recorded ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.id_to_node.keys().copied()
    }
}

impl<N: Copy + Eq + Hash> Default for Mirror<N> {
    fn default() -> Self {
        Self::new()
    }
}
