//! Per-key collections: the pure/annotation partition of one layer
//!
//! A document owns one `NodeLayer` per distinct node (layer, variant) key and
//! one `EdgeLayer` per distinct edge key. Collections are created lazily on
//! first insert and dropped by the document once they become empty.

use std::collections::HashSet;
use std::sync::Arc;

use super::interval::{IntervalIndex, SpanKey};
use super::layer::LayerKey;
use super::refs::{EdgeRef, NodeRef};

/// Nodes of one (layer, variant) key, split into unranged members and an
/// interval-indexed annotation set.
#[derive(Debug, Clone)]
pub struct NodeLayer {
    key: Arc<LayerKey>,
    pure: HashSet<NodeRef>,
    index: IntervalIndex,
}

impl NodeLayer {
    pub(crate) fn new(key: Arc<LayerKey>) -> Self {
        Self {
            key,
            pure: HashSet::new(),
            index: IntervalIndex::new(),
        }
    }

    pub fn key(&self) -> &LayerKey {
        &self.key
    }

    pub(crate) fn key_arc(&self) -> Arc<LayerKey> {
        Arc::clone(&self.key)
    }

    pub fn len(&self) -> usize {
        self.pure.len() + self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pure.is_empty() && self.index.is_empty()
    }

    /// The interval index over this layer's annotations.
    pub fn annotations(&self) -> &IntervalIndex {
        &self.index
    }

    /// Unranged members, in no particular order.
    pub fn pure(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.pure.iter().copied()
    }

    /// All members: pure nodes first, then annotations in index order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.pure
            .iter()
            .copied()
            .chain(self.index.iter().map(|(_, n)| n))
    }

    pub(crate) fn insert_pure(&mut self, node: NodeRef) {
        self.pure.insert(node);
    }

    pub(crate) fn remove_pure(&mut self, node: &NodeRef) -> bool {
        self.pure.remove(node)
    }

    pub(crate) fn insert_span(&mut self, key: SpanKey, node: NodeRef) {
        self.index.insert(key, node);
    }

    pub(crate) fn remove_span(&mut self, key: &SpanKey) -> Option<NodeRef> {
        self.index.remove(key)
    }

    pub(crate) fn reindex_span(
        &mut self,
        old: &SpanKey,
        start: usize,
        end: usize,
    ) -> Option<SpanKey> {
        self.index.reindex(old, start, end)
    }
}

/// Edges of one (layer, variant) key.
#[derive(Debug, Clone)]
pub struct EdgeLayer {
    key: Arc<LayerKey>,
    members: HashSet<EdgeRef>,
}

impl EdgeLayer {
    pub(crate) fn new(key: Arc<LayerKey>) -> Self {
        Self {
            key,
            members: HashSet::new(),
        }
    }

    pub fn key(&self) -> &LayerKey {
        &self.key
    }

    pub(crate) fn key_arc(&self) -> Arc<LayerKey> {
        Arc::clone(&self.key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EdgeRef> + '_ {
        self.members.iter().copied()
    }

    pub(crate) fn insert(&mut self, edge: EdgeRef) {
        self.members.insert(edge);
    }

    pub(crate) fn remove(&mut self, edge: &EdgeRef) -> bool {
        self.members.remove(edge)
    }
}
