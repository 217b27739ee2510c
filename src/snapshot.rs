//! Serialization walk over a document
//!
//! A snapshot is the codec-facing rendition of a store: document properties,
//! every (layer, variant) node collection split into pure members and
//! annotations, and every edge with resolved endpoints. Entity ids are
//! assigned during a single capture pass and mean nothing outside the
//! snapshot they appear in; live identity is the handle, never the id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::graph::{Document, LayerKey, NodeRef, Properties, StoreError};

/// Errors raised while rebuilding a document from a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("edge references unknown entity id {0}")]
    UnknownEntity(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// One pure node in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// One annotation in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    pub id: u32,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// One node collection: pure members and annotations in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLayerSnapshot {
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pure: Vec<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationSnapshot>,
}

/// One edge with endpoints resolved to snapshot ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: u32,
    pub tail: u32,
    pub head: u32,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// One edge collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeLayerSnapshot {
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub edges: Vec<EdgeSnapshot>,
}

/// Full walk of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_layers: Vec<NodeLayerSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_layers: Vec<EdgeLayerSnapshot>,
}

impl DocumentSnapshot {
    /// Walk the document, assigning transient ids in visit order.
    pub fn capture(doc: &Document) -> SnapshotResult<Self> {
        let mut ids: HashMap<NodeRef, u32> = HashMap::new();
        let mut next_id = 0u32;
        let mut node_layers = Vec::new();
        for key in doc.node_layers() {
            let Some(collection) = doc.node_collection(key) else {
                continue;
            };
            let mut pure_refs: Vec<NodeRef> = collection.pure().collect();
            pure_refs.sort();
            let mut pure = Vec::with_capacity(pure_refs.len());
            for node in pure_refs {
                let id = next_id;
                next_id += 1;
                ids.insert(node, id);
                pure.push(NodeSnapshot {
                    id,
                    properties: doc.node_properties(node)?.clone(),
                });
            }
            let mut annotations = Vec::new();
            for (span, node) in collection.annotations().iter() {
                let id = next_id;
                next_id += 1;
                ids.insert(node, id);
                annotations.push(AnnotationSnapshot {
                    id,
                    start: span.start,
                    end: span.end,
                    properties: doc.node_properties(node)?.clone(),
                });
            }
            node_layers.push(NodeLayerSnapshot {
                layer: key.layer.clone(),
                variant: key.variant.clone(),
                pure,
                annotations,
            });
        }

        let mut edge_layers = Vec::new();
        for key in doc.edge_layers() {
            let Some(collection) = doc.edge_collection(key) else {
                continue;
            };
            let mut members: Vec<_> = collection.iter().collect();
            members.sort();
            let mut edges = Vec::with_capacity(members.len());
            for edge in members {
                let id = next_id;
                next_id += 1;
                let (tail, head) = doc.edge_ends(edge)?;
                let tail = ids.get(&tail).copied().ok_or_else(|| {
                    SnapshotError::Store(StoreError::InvalidNode(tail))
                })?;
                let head = ids.get(&head).copied().ok_or_else(|| {
                    SnapshotError::Store(StoreError::InvalidNode(head))
                })?;
                edges.push(EdgeSnapshot {
                    id,
                    tail,
                    head,
                    properties: doc.edge_properties(edge)?.clone(),
                });
            }
            edge_layers.push(EdgeLayerSnapshot {
                layer: key.layer.clone(),
                variant: key.variant.clone(),
                edges,
            });
        }

        Ok(Self {
            id: doc.id(),
            text: doc.text().to_string(),
            properties: doc.properties().clone(),
            node_layers,
            edge_layers,
        })
    }

    /// Rebuild a live store. Handles are freshly assigned; everything else
    /// round-trips.
    pub fn restore(&self) -> SnapshotResult<Document> {
        let mut doc = Document::with_text(self.text.clone());
        doc.set_id(self.id);
        *doc.properties_mut() = self.properties.clone();

        let mut refs: HashMap<u32, NodeRef> = HashMap::new();
        for layer in &self.node_layers {
            let key = match &layer.variant {
                Some(variant) => LayerKey::with_variant(&layer.layer, variant),
                None => LayerKey::new(&layer.layer),
            };
            for node in &layer.pure {
                let created = doc.create_node(key.clone());
                *doc.node_properties_mut(created)? = node.properties.clone();
                refs.insert(node.id, created);
            }
            // insertion order preserves the index tie-break for equal ranges
            for ann in &layer.annotations {
                let created = doc.create_annotation(key.clone(), ann.start, ann.end)?;
                *doc.node_properties_mut(created)? = ann.properties.clone();
                refs.insert(ann.id, created);
            }
        }

        for layer in &self.edge_layers {
            let key = match &layer.variant {
                Some(variant) => LayerKey::with_variant(&layer.layer, variant),
                None => LayerKey::new(&layer.layer),
            };
            for edge in &layer.edges {
                let tail = *refs
                    .get(&edge.tail)
                    .ok_or(SnapshotError::UnknownEntity(edge.tail))?;
                let head = *refs
                    .get(&edge.head)
                    .ok_or(SnapshotError::UnknownEntity(edge.head))?;
                let created = doc.create_edge(key.clone(), tail, head)?;
                *doc.edge_properties_mut(created)? = edge.properties.clone();
            }
        }

        Ok(doc)
    }
}
