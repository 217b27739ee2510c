//! Document: the layered annotation graph store
//!
//! A document owns a text buffer, a property map, and every node/edge
//! collection keyed by (layer, variant). Entities live in generation-checked
//! arena slots; handles stay stable across property, range and layer mutation
//! and stop resolving once the entity is removed. Every node record carries
//! its inbound and outbound edge sets, so neighbour traversal never scans the
//! full edge population.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::collection::{EdgeLayer, NodeLayer};
use super::interval::SpanKey;
use super::layer::LayerKey;
use super::refs::{EdgeRef, NodeRef};
use super::value::{Properties, Value};

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid node reference: {0}")]
    InvalidNode(NodeRef),

    #[error("invalid edge reference: {0}")]
    InvalidEdge(EdgeRef),

    #[error("malformed range [{start}, {end}) for text of length {len}")]
    MalformedRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("no such layer: {0}")]
    UnknownLayer(LayerKey),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What to do with annotations whose range collapses to empty during a text
/// splice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptySpans {
    /// Delete the annotation (and its incident edges).
    #[default]
    Remove,
    /// Keep it as a zero-length annotation at the edit boundary.
    Keep,
}

/// Document identity and modification timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocumentMeta {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Some(Utc::now()),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    gen: u32,
    value: Option<T>,
}

#[derive(Debug, Clone)]
struct NodeRecord {
    layer: Arc<LayerKey>,
    span: Option<SpanKey>,
    properties: Properties,
    inbound: HashSet<EdgeRef>,
    outbound: HashSet<EdgeRef>,
}

impl NodeRecord {
    fn new(layer: Arc<LayerKey>, span: Option<SpanKey>) -> Self {
        Self {
            layer,
            span,
            properties: Properties::new(),
            inbound: HashSet::new(),
            outbound: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    layer: Arc<LayerKey>,
    tail: NodeRef,
    head: NodeRef,
    properties: Properties,
}

/// A single annotated document: text, properties, and the full set of node
/// and edge collections.
#[derive(Debug, Clone)]
pub struct Document {
    meta: DocumentMeta,
    text: String,
    properties: Properties,
    nodes: Vec<Slot<NodeRecord>>,
    free_nodes: Vec<u32>,
    edges: Vec<Slot<EdgeRecord>>,
    free_edges: Vec<u32>,
    node_layers: BTreeMap<LayerKey, NodeLayer>,
    edge_layers: BTreeMap<LayerKey, EdgeLayer>,
    next_seq: u64,
    epoch: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            meta: DocumentMeta::new(),
            text: String::new(),
            properties: Properties::new(),
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            edges: Vec::new(),
            free_edges: Vec::new(),
            node_layers: BTreeMap::new(),
            edge_layers: BTreeMap::new(),
            next_seq: 0,
            epoch: 0,
        }
    }

    /// Create a document over the given text.
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.text = text.into();
        doc
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn id(&self) -> Uuid {
        self.meta.id
    }

    pub(crate) fn set_id(&mut self, id: Uuid) {
        self.meta.id = id;
    }

    /// Bumped on every layer migration; used to invalidate cached wrappers.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // --- Text ---

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the whole text. Existing annotation offsets are left alone;
    /// adjusting them is the caller's business. `splice` is the range-aware
    /// edit.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.touch();
    }

    /// Replace `[start, end)` of the text and shift annotation ranges.
    ///
    /// Annotation text outside the replaced span keeps its annotations: a
    /// prefix or suffix that survives the edit stays annotated, an annotation
    /// surrounding the whole span stretches over the replacement, and the
    /// overlap with the replaced span is dropped. An annotation whose range
    /// collapses to empty is deleted under `EmptySpans::Remove`, kept
    /// zero-length at the edit boundary under `EmptySpans::Keep`.
    pub fn splice(
        &mut self,
        start: usize,
        end: usize,
        replacement: &str,
        policy: EmptySpans,
    ) -> StoreResult<()> {
        self.check_range(start, end)?;
        let removed = end - start;
        let inserted = replacement.len();

        // Snapshot every adjustment before touching any index.
        let mut moves: Vec<(LayerKey, SpanKey, NodeRef, usize, usize)> = Vec::new();
        let mut drops: Vec<NodeRef> = Vec::new();
        for (key, layer) in &self.node_layers {
            for (span, node) in layer.annotations().iter() {
                if span.end <= start {
                    continue;
                }
                let mut new_start = remap_low(span.start, start, end, removed, inserted);
                let mut new_end = remap_high(span.end, start, end, removed, inserted);
                if new_start > new_end {
                    // annotation lived entirely inside the replaced span
                    new_start = start + inserted;
                    new_end = new_start;
                }
                if new_start == span.start && new_end == span.end {
                    continue;
                }
                let collapsed = new_start == new_end && span.start != span.end;
                if collapsed && policy == EmptySpans::Remove {
                    drops.push(node);
                } else {
                    moves.push((key.clone(), span, node, new_start, new_end));
                }
            }
        }

        self.text.replace_range(start..end, replacement);
        for (key, span, node, new_start, new_end) in moves {
            if let Some(layer) = self.node_layers.get_mut(&key) {
                if let Some(new) = layer.reindex_span(&span, new_start, new_end) {
                    if let Ok(record) = self.node_record_mut(node) {
                        record.span = Some(new);
                    }
                }
            }
        }
        let dropped = drops.len();
        for node in drops {
            self.remove_node(node)?;
        }
        debug!(start, end, removed, inserted, dropped, "spliced text");
        self.touch();
        Ok(())
    }

    // --- Document properties ---

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        self.touch();
        &mut self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
        self.touch();
    }

    // --- Node lifecycle ---

    /// Create a pure (unranged) node in the given layer.
    pub fn create_node(&mut self, key: impl Into<LayerKey>) -> NodeRef {
        let key = key.into();
        let layer = self.node_layer_arc(&key);
        let node = self.alloc_node(NodeRecord::new(layer, None));
        if let Some(collection) = self.node_layers.get_mut(&key) {
            collection.insert_pure(node);
        }
        self.touch();
        node
    }

    /// Create an annotation over `[start, end)` in the given layer.
    pub fn create_annotation(
        &mut self,
        key: impl Into<LayerKey>,
        start: usize,
        end: usize,
    ) -> StoreResult<NodeRef> {
        self.check_range(start, end)?;
        let key = key.into();
        let layer = self.node_layer_arc(&key);
        let span = SpanKey {
            start,
            end,
            seq: self.next_seq(),
        };
        let node = self.alloc_node(NodeRecord::new(layer, Some(span)));
        if let Some(collection) = self.node_layers.get_mut(&key) {
            collection.insert_span(span, node);
        }
        self.touch();
        Ok(node)
    }

    /// Remove a node. Every incident edge is removed first, so no edge is
    /// ever left registered on a stale endpoint.
    pub fn remove_node(&mut self, node: NodeRef) -> StoreResult<()> {
        let (key, span, incident) = {
            let record = self.node_record(node)?;
            let incident: Vec<EdgeRef> =
                record.inbound.union(&record.outbound).copied().collect();
            ((*record.layer).clone(), record.span, incident)
        };
        for edge in incident {
            self.remove_edge(edge)?;
        }
        if let Some(collection) = self.node_layers.get_mut(&key) {
            match span {
                Some(span) => {
                    collection.remove_span(&span);
                }
                None => {
                    collection.remove_pure(&node);
                }
            }
        }
        self.drop_node_layer_if_empty(&key);
        self.free_node(node);
        self.touch();
        Ok(())
    }

    /// Whether the handle still resolves.
    pub fn contains_node(&self, node: NodeRef) -> bool {
        self.node_record(node).is_ok()
    }

    // --- Node state ---

    /// The (layer, variant) key the node currently belongs to.
    pub fn node_layer_of(&self, node: NodeRef) -> StoreResult<&LayerKey> {
        Ok(&self.node_record(node)?.layer)
    }

    /// The node's `[start, end)` range, or None for a pure node.
    pub fn range(&self, node: NodeRef) -> StoreResult<Option<(usize, usize)>> {
        Ok(self.node_record(node)?.span.map(|s| (s.start, s.end)))
    }

    /// Whether the node currently has a range.
    pub fn is_annotation(&self, node: NodeRef) -> StoreResult<bool> {
        Ok(self.node_record(node)?.span.is_some())
    }

    /// The text the annotation covers, or None for a pure node (or a range
    /// that no longer lies on char boundaries after a raw `set_text`).
    pub fn covered_text(&self, node: NodeRef) -> StoreResult<Option<&str>> {
        Ok(self
            .node_record(node)?
            .span
            .and_then(|s| self.text.get(s.start..s.end)))
    }

    /// Set (or change) the node's range, turning a pure node into an
    /// annotation if needed. The interval index entry is re-keyed in place.
    pub fn set_range(&mut self, node: NodeRef, start: usize, end: usize) -> StoreResult<()> {
        self.check_range(start, end)?;
        let (key, old_span) = {
            let record = self.node_record(node)?;
            ((*record.layer).clone(), record.span)
        };
        let new_span = match old_span {
            Some(old) => self
                .node_layers
                .get_mut(&key)
                .and_then(|layer| layer.reindex_span(&old, start, end)),
            None => {
                let span = SpanKey {
                    start,
                    end,
                    seq: self.next_seq(),
                };
                if let Some(layer) = self.node_layers.get_mut(&key) {
                    layer.remove_pure(&node);
                    layer.insert_span(span, node);
                }
                Some(span)
            }
        };
        if let Ok(record) = self.node_record_mut(node) {
            record.span = new_span;
        }
        self.touch();
        Ok(())
    }

    /// Clear the node's range, turning an annotation back into a pure node.
    pub fn clear_range(&mut self, node: NodeRef) -> StoreResult<()> {
        let (key, span) = {
            let record = self.node_record(node)?;
            ((*record.layer).clone(), record.span)
        };
        let Some(span) = span else {
            return Ok(());
        };
        if let Some(layer) = self.node_layers.get_mut(&key) {
            layer.remove_span(&span);
            layer.insert_pure(node);
        }
        if let Ok(record) = self.node_record_mut(node) {
            record.span = None;
        }
        self.touch();
        Ok(())
    }

    /// Move the node to another variant of its layer, relocating it between
    /// collections while keeping its handle, range and adjacency.
    pub fn set_node_variant(&mut self, node: NodeRef, variant: Option<String>) -> StoreResult<()> {
        let (old_key, span) = {
            let record = self.node_record(node)?;
            ((*record.layer).clone(), record.span)
        };
        let new_key = old_key.in_variant(variant);
        if new_key == old_key {
            return Ok(());
        }
        if let Some(layer) = self.node_layers.get_mut(&old_key) {
            match span {
                Some(span) => {
                    layer.remove_span(&span);
                }
                None => {
                    layer.remove_pure(&node);
                }
            }
        }
        self.drop_node_layer_if_empty(&old_key);
        let arc = self.node_layer_arc(&new_key);
        if let Some(layer) = self.node_layers.get_mut(&new_key) {
            match span {
                Some(span) => layer.insert_span(span, node),
                None => layer.insert_pure(node),
            }
        }
        if let Ok(record) = self.node_record_mut(node) {
            record.layer = arc;
        }
        self.touch();
        Ok(())
    }

    pub fn node_properties(&self, node: NodeRef) -> StoreResult<&Properties> {
        Ok(&self.node_record(node)?.properties)
    }

    pub fn node_properties_mut(&mut self, node: NodeRef) -> StoreResult<&mut Properties> {
        self.touch();
        Ok(&mut self.node_record_mut(node)?.properties)
    }

    pub fn set_node_property(
        &mut self,
        node: NodeRef,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> StoreResult<()> {
        self.node_record_mut(node)?
            .properties
            .insert(key.into(), value.into());
        self.touch();
        Ok(())
    }

    // --- Adjacency ---

    /// Edges whose head is this node.
    pub fn inbound(&self, node: NodeRef) -> StoreResult<Vec<EdgeRef>> {
        Ok(self.node_record(node)?.inbound.iter().copied().collect())
    }

    /// Edges whose tail is this node.
    pub fn outbound(&self, node: NodeRef) -> StoreResult<Vec<EdgeRef>> {
        Ok(self.node_record(node)?.outbound.iter().copied().collect())
    }

    // --- Edge lifecycle ---

    /// Create an edge from `tail` to `head` in the given layer, registering
    /// it on both endpoints.
    pub fn create_edge(
        &mut self,
        key: impl Into<LayerKey>,
        tail: NodeRef,
        head: NodeRef,
    ) -> StoreResult<EdgeRef> {
        self.node_record(tail)?;
        self.node_record(head)?;
        let key = key.into();
        let layer = self.edge_layer_arc(&key);
        let edge = self.alloc_edge(EdgeRecord {
            layer,
            tail,
            head,
            properties: Properties::new(),
        });
        if let Some(collection) = self.edge_layers.get_mut(&key) {
            collection.insert(edge);
        }
        if let Ok(record) = self.node_record_mut(tail) {
            record.outbound.insert(edge);
        }
        if let Ok(record) = self.node_record_mut(head) {
            record.inbound.insert(edge);
        }
        self.touch();
        Ok(edge)
    }

    /// Reconnect an edge to new endpoints. The edge is deregistered from its
    /// old endpoints and registered on the new ones in one step; it is never
    /// left on a stale endpoint.
    pub fn connect(&mut self, edge: EdgeRef, tail: NodeRef, head: NodeRef) -> StoreResult<()> {
        self.node_record(tail)?;
        self.node_record(head)?;
        let (old_tail, old_head) = {
            let record = self.edge_record(edge)?;
            (record.tail, record.head)
        };
        if let Ok(record) = self.node_record_mut(old_tail) {
            record.outbound.remove(&edge);
        }
        if let Ok(record) = self.node_record_mut(old_head) {
            record.inbound.remove(&edge);
        }
        if let Ok(record) = self.edge_record_mut(edge) {
            record.tail = tail;
            record.head = head;
        }
        if let Ok(record) = self.node_record_mut(tail) {
            record.outbound.insert(edge);
        }
        if let Ok(record) = self.node_record_mut(head) {
            record.inbound.insert(edge);
        }
        self.touch();
        Ok(())
    }

    /// Remove an edge, deregistering it from both endpoints first.
    pub fn remove_edge(&mut self, edge: EdgeRef) -> StoreResult<()> {
        let (key, tail, head) = {
            let record = self.edge_record(edge)?;
            ((*record.layer).clone(), record.tail, record.head)
        };
        if let Ok(record) = self.node_record_mut(tail) {
            record.outbound.remove(&edge);
        }
        if let Ok(record) = self.node_record_mut(head) {
            record.inbound.remove(&edge);
        }
        if let Some(collection) = self.edge_layers.get_mut(&key) {
            collection.remove(&edge);
        }
        self.drop_edge_layer_if_empty(&key);
        self.free_edge(edge);
        self.touch();
        Ok(())
    }

    pub fn contains_edge(&self, edge: EdgeRef) -> bool {
        self.edge_record(edge).is_ok()
    }

    // --- Edge state ---

    pub fn edge_layer_of(&self, edge: EdgeRef) -> StoreResult<&LayerKey> {
        Ok(&self.edge_record(edge)?.layer)
    }

    /// The edge's (tail, head) endpoints.
    pub fn edge_ends(&self, edge: EdgeRef) -> StoreResult<(NodeRef, NodeRef)> {
        let record = self.edge_record(edge)?;
        Ok((record.tail, record.head))
    }

    pub fn tail(&self, edge: EdgeRef) -> StoreResult<NodeRef> {
        Ok(self.edge_record(edge)?.tail)
    }

    pub fn head(&self, edge: EdgeRef) -> StoreResult<NodeRef> {
        Ok(self.edge_record(edge)?.head)
    }

    /// Move the edge to another variant of its layer.
    pub fn set_edge_variant(&mut self, edge: EdgeRef, variant: Option<String>) -> StoreResult<()> {
        let old_key = (*self.edge_record(edge)?.layer).clone();
        let new_key = old_key.in_variant(variant);
        if new_key == old_key {
            return Ok(());
        }
        if let Some(layer) = self.edge_layers.get_mut(&old_key) {
            layer.remove(&edge);
        }
        self.drop_edge_layer_if_empty(&old_key);
        let arc = self.edge_layer_arc(&new_key);
        if let Some(layer) = self.edge_layers.get_mut(&new_key) {
            layer.insert(edge);
        }
        if let Ok(record) = self.edge_record_mut(edge) {
            record.layer = arc;
        }
        self.touch();
        Ok(())
    }

    pub fn edge_properties(&self, edge: EdgeRef) -> StoreResult<&Properties> {
        Ok(&self.edge_record(edge)?.properties)
    }

    pub fn edge_properties_mut(&mut self, edge: EdgeRef) -> StoreResult<&mut Properties> {
        self.touch();
        Ok(&mut self.edge_record_mut(edge)?.properties)
    }

    pub fn set_edge_property(
        &mut self,
        edge: EdgeRef,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> StoreResult<()> {
        self.edge_record_mut(edge)?
            .properties
            .insert(key.into(), value.into());
        self.touch();
        Ok(())
    }

    // --- Migration ---

    /// Move every node of `from` into the `to` collection (created if
    /// absent), preserving handles, ranges, properties and adjacency. The
    /// source collection is dropped. Cached wrappers for the moved nodes are
    /// invalidated via the document epoch.
    pub fn migrate_nodes(&mut self, from: &LayerKey, to: LayerKey) -> StoreResult<usize> {
        if *from == to {
            return match self.node_layers.get(from) {
                Some(layer) => Ok(layer.len()),
                None => Err(StoreError::UnknownLayer(from.clone())),
            };
        }
        let Some(source) = self.node_layers.remove(from) else {
            return Err(StoreError::UnknownLayer(from.clone()));
        };
        let arc = self.node_layer_arc(&to);
        let mut moved = 0usize;
        for node in source.pure() {
            if let Some(dest) = self.node_layers.get_mut(&to) {
                dest.insert_pure(node);
            }
            if let Ok(record) = self.node_record_mut(node) {
                record.layer = Arc::clone(&arc);
            }
            moved += 1;
        }
        for (span, node) in source.annotations().iter() {
            if let Some(dest) = self.node_layers.get_mut(&to) {
                dest.insert_span(span, node);
            }
            if let Ok(record) = self.node_record_mut(node) {
                record.layer = Arc::clone(&arc);
            }
            moved += 1;
        }
        self.epoch += 1;
        debug!(from = %from, to = %to, moved, "migrated node layer");
        self.touch();
        Ok(moved)
    }

    /// Move every edge of `from` into the `to` collection. Same contract as
    /// `migrate_nodes`.
    pub fn migrate_edges(&mut self, from: &LayerKey, to: LayerKey) -> StoreResult<usize> {
        if *from == to {
            return match self.edge_layers.get(from) {
                Some(layer) => Ok(layer.len()),
                None => Err(StoreError::UnknownLayer(from.clone())),
            };
        }
        let Some(source) = self.edge_layers.remove(from) else {
            return Err(StoreError::UnknownLayer(from.clone()));
        };
        let arc = self.edge_layer_arc(&to);
        let mut moved = 0usize;
        for edge in source.iter() {
            if let Some(dest) = self.edge_layers.get_mut(&to) {
                dest.insert(edge);
            }
            if let Ok(record) = self.edge_record_mut(edge) {
                record.layer = Arc::clone(&arc);
            }
            moved += 1;
        }
        self.epoch += 1;
        debug!(from = %from, to = %to, moved, "migrated edge layer");
        self.touch();
        Ok(moved)
    }

    // --- Bulk removal ---

    /// Remove every node of a layer (and their incident edges). Members are
    /// snapshotted before the first removal, since removal mutates the
    /// collection being walked.
    pub fn remove_node_layer(&mut self, key: &LayerKey) -> StoreResult<usize> {
        let Some(layer) = self.node_layers.get(key) else {
            return Err(StoreError::UnknownLayer(key.clone()));
        };
        let members: Vec<NodeRef> = layer.iter().collect();
        for node in &members {
            self.remove_node(*node)?;
        }
        debug!(layer = %key, removed = members.len(), "removed node layer");
        Ok(members.len())
    }

    /// Remove every edge of a layer.
    pub fn remove_edge_layer(&mut self, key: &LayerKey) -> StoreResult<usize> {
        let Some(layer) = self.edge_layers.get(key) else {
            return Err(StoreError::UnknownLayer(key.clone()));
        };
        let members: Vec<EdgeRef> = layer.iter().collect();
        for edge in &members {
            self.remove_edge(*edge)?;
        }
        debug!(layer = %key, removed = members.len(), "removed edge layer");
        Ok(members.len())
    }

    // --- Enumeration ---

    /// Keys of every node collection, in key order.
    pub fn node_layers(&self) -> impl Iterator<Item = &LayerKey> {
        self.node_layers.keys()
    }

    /// Keys of every edge collection, in key order.
    pub fn edge_layers(&self) -> impl Iterator<Item = &LayerKey> {
        self.edge_layers.keys()
    }

    pub fn node_collection(&self, key: &LayerKey) -> Option<&NodeLayer> {
        self.node_layers.get(key)
    }

    pub fn edge_collection(&self, key: &LayerKey) -> Option<&EdgeLayer> {
        self.edge_layers.get(key)
    }

    /// Every node in the document, collection by collection.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.node_layers.values().flat_map(|layer| layer.iter())
    }

    /// Every edge in the document.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef> + '_ {
        self.edge_layers.values().flat_map(|layer| layer.iter())
    }

    pub fn node_count(&self) -> usize {
        self.node_layers.values().map(|layer| layer.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_layers.values().map(|layer| layer.len()).sum()
    }

    // --- Internals ---

    fn check_range(&self, start: usize, end: usize) -> StoreResult<()> {
        if end < start || end > self.text.len() {
            return Err(StoreError::MalformedRange {
                start,
                end,
                len: self.text.len(),
            });
        }
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn touch(&mut self) {
        self.meta.updated_at = Some(Utc::now());
    }

    fn node_layer_arc(&mut self, key: &LayerKey) -> Arc<LayerKey> {
        self.node_layers
            .entry(key.clone())
            .or_insert_with(|| NodeLayer::new(Arc::new(key.clone())))
            .key_arc()
    }

    fn edge_layer_arc(&mut self, key: &LayerKey) -> Arc<LayerKey> {
        self.edge_layers
            .entry(key.clone())
            .or_insert_with(|| EdgeLayer::new(Arc::new(key.clone())))
            .key_arc()
    }

    fn drop_node_layer_if_empty(&mut self, key: &LayerKey) {
        if self
            .node_layers
            .get(key)
            .is_some_and(|layer| layer.is_empty())
        {
            self.node_layers.remove(key);
        }
    }

    fn drop_edge_layer_if_empty(&mut self, key: &LayerKey) {
        if self
            .edge_layers
            .get(key)
            .is_some_and(|layer| layer.is_empty())
        {
            self.edge_layers.remove(key);
        }
    }

    fn alloc_node(&mut self, record: NodeRecord) -> NodeRef {
        match self.free_nodes.pop() {
            Some(slot) => {
                let entry = &mut self.nodes[slot as usize];
                entry.value = Some(record);
                NodeRef {
                    slot,
                    gen: entry.gen,
                }
            }
            None => {
                let slot = self.nodes.len() as u32;
                self.nodes.push(Slot {
                    gen: 0,
                    value: Some(record),
                });
                NodeRef { slot, gen: 0 }
            }
        }
    }

    fn free_node(&mut self, node: NodeRef) {
        if let Some(entry) = self.nodes.get_mut(node.slot as usize) {
            entry.value = None;
            entry.gen = entry.gen.wrapping_add(1);
            self.free_nodes.push(node.slot);
        }
    }

    fn alloc_edge(&mut self, record: EdgeRecord) -> EdgeRef {
        match self.free_edges.pop() {
            Some(slot) => {
                let entry = &mut self.edges[slot as usize];
                entry.value = Some(record);
                EdgeRef {
                    slot,
                    gen: entry.gen,
                }
            }
            None => {
                let slot = self.edges.len() as u32;
                self.edges.push(Slot {
                    gen: 0,
                    value: Some(record),
                });
                EdgeRef { slot, gen: 0 }
            }
        }
    }

    fn free_edge(&mut self, edge: EdgeRef) {
        if let Some(entry) = self.edges.get_mut(edge.slot as usize) {
            entry.value = None;
            entry.gen = entry.gen.wrapping_add(1);
            self.free_edges.push(edge.slot);
        }
    }

    fn node_record(&self, node: NodeRef) -> StoreResult<&NodeRecord> {
        self.nodes
            .get(node.slot as usize)
            .filter(|entry| entry.gen == node.gen)
            .and_then(|entry| entry.value.as_ref())
            .ok_or(StoreError::InvalidNode(node))
    }

    fn node_record_mut(&mut self, node: NodeRef) -> StoreResult<&mut NodeRecord> {
        self.nodes
            .get_mut(node.slot as usize)
            .filter(|entry| entry.gen == node.gen)
            .and_then(|entry| entry.value.as_mut())
            .ok_or(StoreError::InvalidNode(node))
    }

    fn edge_record(&self, edge: EdgeRef) -> StoreResult<&EdgeRecord> {
        self.edges
            .get(edge.slot as usize)
            .filter(|entry| entry.gen == edge.gen)
            .and_then(|entry| entry.value.as_ref())
            .ok_or(StoreError::InvalidEdge(edge))
    }

    fn edge_record_mut(&mut self, edge: EdgeRef) -> StoreResult<&mut EdgeRecord> {
        self.edges
            .get_mut(edge.slot as usize)
            .filter(|entry| entry.gen == edge.gen)
            .and_then(|entry| entry.value.as_mut())
            .ok_or(StoreError::InvalidEdge(edge))
    }
}

/// Offset remapping for range starts across a `[start, end) -> replacement`
/// edit: interior offsets land after the replacement.
fn remap_low(pos: usize, start: usize, end: usize, removed: usize, inserted: usize) -> usize {
    if pos <= start {
        pos
    } else if pos >= end {
        pos - removed + inserted
    } else {
        start + inserted
    }
}

/// Offset remapping for range ends: interior offsets land before the
/// replacement, so a partial overlap keeps only its surviving prefix.
fn remap_high(pos: usize, start: usize, end: usize, removed: usize, inserted: usize) -> usize {
    if pos <= start {
        pos
    } else if pos >= end {
        pos - removed + inserted
    } else {
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_read_annotation() {
        let mut doc = Document::with_text("Greetings from Lund");
        let token = doc.create_annotation("Token", 0, 9).unwrap();
        assert_eq!(doc.range(token).unwrap(), Some((0, 9)));
        assert_eq!(doc.covered_text(token).unwrap(), Some("Greetings"));
        assert!(doc.is_annotation(token).unwrap());
    }

    #[test]
    fn malformed_range_is_rejected_without_side_effects() {
        let mut doc = Document::with_text("abc");
        assert!(matches!(
            doc.create_annotation("Token", 2, 1),
            Err(StoreError::MalformedRange { .. })
        ));
        assert!(matches!(
            doc.create_annotation("Token", 0, 4),
            Err(StoreError::MalformedRange { .. })
        ));
        assert_eq!(doc.node_count(), 0);
        assert_eq!(doc.node_layers().count(), 0);
    }

    #[test]
    fn removed_handle_stops_resolving() {
        let mut doc = Document::with_text("abc");
        let node = doc.create_node("Entity");
        doc.remove_node(node).unwrap();
        assert!(!doc.contains_node(node));
        assert!(matches!(
            doc.range(node),
            Err(StoreError::InvalidNode(_))
        ));
    }

    #[test]
    fn slot_reuse_does_not_resurrect_old_handles() {
        let mut doc = Document::new();
        let first = doc.create_node("Entity");
        doc.remove_node(first).unwrap();
        let second = doc.create_node("Entity");
        // the slot is reused but the stale handle stays dead
        assert!(doc.contains_node(second));
        assert!(!doc.contains_node(first));
        assert_ne!(first, second);
    }

    #[test]
    fn collections_are_lazy_and_dropped_when_empty() {
        let mut doc = Document::with_text("abc");
        assert_eq!(doc.node_layers().count(), 0);
        let node = doc.create_annotation("Token", 0, 3).unwrap();
        assert_eq!(doc.node_layers().count(), 1);
        doc.remove_node(node).unwrap();
        assert_eq!(doc.node_layers().count(), 0);
    }

    #[test]
    fn range_mutation_switches_partition() {
        let mut doc = Document::with_text("abcdef");
        let node = doc.create_node("Entity");
        assert!(!doc.is_annotation(node).unwrap());

        doc.set_range(node, 1, 4).unwrap();
        assert!(doc.is_annotation(node).unwrap());
        let layer = doc.node_collection(&LayerKey::new("Entity")).unwrap();
        assert_eq!(layer.annotations().len(), 1);
        assert_eq!(layer.pure().count(), 0);

        doc.clear_range(node).unwrap();
        assert!(!doc.is_annotation(node).unwrap());
        let layer = doc.node_collection(&LayerKey::new("Entity")).unwrap();
        assert_eq!(layer.annotations().len(), 0);
        assert_eq!(layer.pure().count(), 1);
    }

    #[test]
    fn edge_adjacency_is_symmetric() {
        let mut doc = Document::with_text("ab");
        let a = doc.create_annotation("Token", 0, 1).unwrap();
        let b = doc.create_annotation("Token", 1, 2).unwrap();
        let edge = doc.create_edge("Dep", a, b).unwrap();

        assert_eq!(doc.outbound(a).unwrap(), vec![edge]);
        assert_eq!(doc.inbound(b).unwrap(), vec![edge]);
        assert!(doc.inbound(a).unwrap().is_empty());
        assert_eq!(doc.edge_ends(edge).unwrap(), (a, b));
    }

    #[test]
    fn reconnect_never_leaves_a_stale_registration() {
        let mut doc = Document::with_text("abc");
        let a = doc.create_annotation("Token", 0, 1).unwrap();
        let b = doc.create_annotation("Token", 1, 2).unwrap();
        let c = doc.create_annotation("Token", 2, 3).unwrap();
        let edge = doc.create_edge("Dep", a, b).unwrap();

        doc.connect(edge, b, c).unwrap();
        assert!(doc.outbound(a).unwrap().is_empty());
        assert!(doc.inbound(b).unwrap().is_empty());
        assert_eq!(doc.outbound(b).unwrap(), vec![edge]);
        assert_eq!(doc.inbound(c).unwrap(), vec![edge]);
    }

    #[test]
    fn removing_a_node_removes_incident_edges_only() {
        let mut doc = Document::with_text("abc");
        let a = doc.create_annotation("Token", 0, 1).unwrap();
        let b = doc.create_annotation("Token", 1, 2).unwrap();
        let c = doc.create_annotation("Token", 2, 3).unwrap();
        let ab = doc.create_edge("Dep", a, b).unwrap();
        let bc = doc.create_edge("Dep", b, c).unwrap();

        doc.remove_node(b).unwrap();
        assert!(!doc.contains_edge(ab));
        assert!(!doc.contains_edge(bc));
        assert!(doc.contains_node(a));
        assert!(doc.contains_node(c));
        assert!(doc.outbound(a).unwrap().is_empty());
        assert!(doc.inbound(c).unwrap().is_empty());
    }

    #[test]
    fn self_loop_removal_is_clean() {
        let mut doc = Document::with_text("a");
        let a = doc.create_annotation("Token", 0, 1).unwrap();
        let loop_edge = doc.create_edge("Dep", a, a).unwrap();
        doc.remove_node(a).unwrap();
        assert!(!doc.contains_edge(loop_edge));
        assert_eq!(doc.edge_count(), 0);
    }

    #[test]
    fn variant_change_relocates_between_collections() {
        let mut doc = Document::with_text("abc");
        let node = doc.create_annotation("Token", 0, 3).unwrap();
        doc.set_node_variant(node, Some("gold".into())).unwrap();

        assert!(doc.node_collection(&LayerKey::new("Token")).is_none());
        let gold = doc
            .node_collection(&LayerKey::with_variant("Token", "gold"))
            .unwrap();
        assert_eq!(gold.len(), 1);
        assert_eq!(doc.range(node).unwrap(), Some((0, 3)));
    }

    #[test]
    fn migration_preserves_identity_and_adjacency() {
        let mut doc = Document::with_text("abcdef");
        let a = doc.create_annotation("Span", 0, 2).unwrap();
        let b = doc.create_node("Span");
        let edge = doc.create_edge("Rel", a, b).unwrap();
        doc.set_node_property(a, "pos", "NN").unwrap();
        let epoch = doc.epoch();

        let from = LayerKey::new("Span");
        let to = LayerKey::with_variant("Span", "v2");
        let moved = doc.migrate_nodes(&from, to.clone()).unwrap();
        assert_eq!(moved, 2);
        assert!(doc.node_collection(&from).is_none());
        assert_eq!(doc.node_collection(&to).unwrap().len(), 2);
        assert_eq!(doc.node_layer_of(a).unwrap(), &to);
        assert_eq!(doc.range(a).unwrap(), Some((0, 2)));
        assert_eq!(
            doc.node_properties(a).unwrap().get("pos"),
            Some(&Value::from("NN"))
        );
        assert_eq!(doc.outbound(a).unwrap(), vec![edge]);
        assert!(doc.epoch() > epoch);
    }

    #[test]
    fn migrating_a_missing_layer_fails() {
        let mut doc = Document::new();
        let err = doc
            .migrate_nodes(&LayerKey::new("Nope"), LayerKey::new("Other"))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownLayer(_)));
    }

    #[test]
    fn splice_shifts_following_annotations() {
        let mut doc = Document::with_text("Greetings from Lund");
        let from = doc.create_annotation("Token", 10, 14).unwrap();
        let lund = doc.create_annotation("Token", 15, 19).unwrap();
        // "Greetings" -> "Hi"
        doc.splice(0, 9, "Hi", EmptySpans::Remove).unwrap();
        assert_eq!(doc.text(), "Hi from Lund");
        assert_eq!(doc.range(from).unwrap(), Some((3, 7)));
        assert_eq!(doc.covered_text(lund).unwrap(), Some("Lund"));
    }

    #[test]
    fn splice_clamps_partial_overlaps() {
        let mut doc = Document::with_text("0123456789");
        let prefix = doc.create_annotation("Span", 0, 5).unwrap();
        let suffix = doc.create_annotation("Span", 5, 10).unwrap();
        let around = doc.create_annotation("Span", 2, 8).unwrap();
        doc.splice(4, 6, "xxx", EmptySpans::Remove).unwrap();
        assert_eq!(doc.text(), "0123xxx6789");
        // overlap into the edit keeps the surviving prefix
        assert_eq!(doc.range(prefix).unwrap(), Some((0, 4)));
        // overlap out of the edit keeps the surviving suffix
        assert_eq!(doc.range(suffix).unwrap(), Some((7, 11)));
        // an annotation surrounding the edit stretches over the replacement
        assert_eq!(doc.range(around).unwrap(), Some((2, 9)));
    }

    #[test]
    fn splice_empty_span_policy() {
        let mut doc = Document::with_text("0123456789");
        let doomed = doc.create_annotation("Span", 4, 6).unwrap();
        doc.splice(3, 7, "", EmptySpans::Remove).unwrap();
        assert!(!doc.contains_node(doomed));

        let mut doc = Document::with_text("0123456789");
        let kept = doc.create_annotation("Span", 4, 6).unwrap();
        doc.splice(3, 7, "", EmptySpans::Keep).unwrap();
        assert_eq!(doc.range(kept).unwrap(), Some((3, 3)));
    }

    #[test]
    fn document_properties_round_trip() {
        let mut doc = Document::new();
        doc.set_property("language", "sv");
        doc.set_property("tokens", 4i64);
        assert_eq!(doc.property("language"), Some(&Value::from("sv")));
        assert_eq!(doc.property("tokens"), Some(&Value::from(4i64)));
    }
}
