//! Derived read operations over a document
//!
//! `DocumentReader` is the query-support facade: pure reads composed from the
//! store's collections and adjacency sets, with no state of its own. Query
//! predicates draw their candidate sets from here.

use std::collections::HashSet;

use crate::graph::{Document, EdgeRef, LayerKey, NodeRef, StoreResult, Value};

use super::types::Direction;

/// Read-only view over one document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentReader<'a> {
    doc: &'a Document,
}

impl<'a> DocumentReader<'a> {
    /// Create a reader over the given document.
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    /// The underlying document.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    // --- Layer enumeration ---

    /// Keys of every node collection present, in key order.
    pub fn node_layers(&self) -> Vec<&'a LayerKey> {
        self.doc.node_layers().collect()
    }

    /// Keys of every edge collection present, in key order.
    pub fn edge_layers(&self) -> Vec<&'a LayerKey> {
        self.doc.edge_layers().collect()
    }

    /// Distinct variants present for a layer name, across node collections.
    pub fn node_variants(&self, layer: &str) -> Vec<Option<&'a str>> {
        self.doc
            .node_layers()
            .filter(|key| key.layer == layer)
            .map(|key| key.variant.as_deref())
            .collect()
    }

    // --- Scans ---

    /// All nodes of a collection: pure members first, then annotations in
    /// start order. Empty if the collection does not exist.
    pub fn nodes(&self, key: &LayerKey) -> Vec<NodeRef> {
        self.doc
            .node_collection(key)
            .map(|layer| layer.iter().collect())
            .unwrap_or_default()
    }

    /// Only the ranged members of a collection, in start order.
    pub fn annotations(&self, key: &LayerKey) -> Vec<NodeRef> {
        self.doc
            .node_collection(key)
            .map(|layer| layer.annotations().iter().map(|(_, n)| n).collect())
            .unwrap_or_default()
    }

    /// All edges of a collection.
    pub fn edges(&self, key: &LayerKey) -> Vec<EdgeRef> {
        self.doc
            .edge_collection(key)
            .map(|layer| layer.iter().collect())
            .unwrap_or_default()
    }

    /// Nodes of a collection holding an exact property value.
    pub fn nodes_where(&self, key: &LayerKey, prop: &str, value: &Value) -> Vec<NodeRef> {
        self.nodes(key)
            .into_iter()
            .filter(|&node| {
                self.doc
                    .node_properties(node)
                    .map(|props| props.get(prop) == Some(value))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Edges of a collection holding an exact property value.
    pub fn edges_where(&self, key: &LayerKey, prop: &str, value: &Value) -> Vec<EdgeRef> {
        self.edges(key)
            .into_iter()
            .filter(|&edge| {
                self.doc
                    .edge_properties(edge)
                    .map(|props| props.get(prop) == Some(value))
                    .unwrap_or(false)
            })
            .collect()
    }

    // --- Range scans ---

    /// Annotations of a collection with `start >= from && end <= to`.
    pub fn covered_by(&self, key: &LayerKey, from: usize, to: usize) -> Vec<NodeRef> {
        self.doc
            .node_collection(key)
            .map(|layer| {
                layer
                    .annotations()
                    .covered_by(from, to)
                    .map(|(_, n)| n)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Annotations of a collection with `end > from && start < to`.
    pub fn overlapping(&self, key: &LayerKey, from: usize, to: usize) -> Vec<NodeRef> {
        self.doc
            .node_collection(key)
            .map(|layer| {
                layer
                    .annotations()
                    .overlapping(from, to)
                    .map(|(_, n)| n)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Annotations of a collection covering the whole query range.
    pub fn covering(&self, key: &LayerKey, from: usize, to: usize) -> Vec<NodeRef> {
        self.doc
            .node_collection(key)
            .map(|layer| {
                layer
                    .annotations()
                    .covering(from, to)
                    .map(|(_, n)| n)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Directed neighbour scans ---

    /// Incident edges of a node restricted to one edge collection and
    /// direction.
    pub fn edges_of(
        &self,
        node: NodeRef,
        edge_key: &LayerKey,
        direction: Direction,
    ) -> StoreResult<Vec<EdgeRef>> {
        let mut edges: Vec<EdgeRef> = match direction {
            Direction::Outgoing => self.doc.outbound(node)?,
            Direction::Incoming => self.doc.inbound(node)?,
            Direction::Both => {
                let mut seen: HashSet<EdgeRef> = self.doc.outbound(node)?.into_iter().collect();
                seen.extend(self.doc.inbound(node)?);
                seen.into_iter().collect()
            }
        };
        edges.retain(|&edge| {
            self.doc
                .edge_layer_of(edge)
                .map(|key| key == edge_key)
                .unwrap_or(false)
        });
        Ok(edges)
    }

    /// Nodes reached from `node` over one edge collection in one direction.
    pub fn neighbours(
        &self,
        node: NodeRef,
        edge_key: &LayerKey,
        direction: Direction,
    ) -> StoreResult<Vec<NodeRef>> {
        let mut out = Vec::new();
        for edge in self.edges_of(node, edge_key, direction)? {
            let (tail, head) = self.doc.edge_ends(edge)?;
            let reached = match direction {
                Direction::Outgoing => head,
                Direction::Incoming => tail,
                Direction::Both => {
                    if tail == node {
                        head
                    } else {
                        tail
                    }
                }
            };
            out.push(reached);
        }
        Ok(out)
    }

    /// Transitive reachability closure from `origin` over one edge
    /// collection in one direction. Depth-first, cycle-safe; every node
    /// appears at most once, origin first.
    pub fn project(
        &self,
        origin: NodeRef,
        edge_key: &LayerKey,
        direction: Direction,
    ) -> StoreResult<Vec<NodeRef>> {
        self.doc.node_layer_of(origin)?;
        let mut visited: HashSet<NodeRef> = HashSet::new();
        let mut order: Vec<NodeRef> = Vec::new();
        let mut stack: Vec<NodeRef> = vec![origin];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);
            for reached in self.neighbours(node, edge_key, direction)? {
                if !visited.contains(&reached) {
                    stack.push(reached);
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EmptySpans;

    fn lund() -> (Document, Vec<NodeRef>, NodeRef) {
        let mut doc = Document::with_text("Greetings from Lund  Sweden");
        let tokens = vec![
            doc.create_annotation("Token", 0, 9).unwrap(),
            doc.create_annotation("Token", 10, 14).unwrap(),
            doc.create_annotation("Token", 15, 19).unwrap(),
            doc.create_annotation("Token", 21, 27).unwrap(),
        ];
        let location = doc.create_annotation("NamedEntity", 15, 27).unwrap();
        doc.set_node_property(location, "type", "Location").unwrap();
        (doc, tokens, location)
    }

    #[test]
    fn covered_by_returns_tokens_inside_the_location() {
        let (doc, tokens, _) = lund();
        let reader = DocumentReader::new(&doc);
        let hits = reader.covered_by(&LayerKey::new("Token"), 15, 27);
        assert_eq!(hits, vec![tokens[2], tokens[3]]);
    }

    #[test]
    fn property_filtered_scan() {
        let (mut doc, tokens, _) = lund();
        doc.set_node_property(tokens[1], "pos", "IN").unwrap();
        let reader = DocumentReader::new(&doc);
        let hits = reader.nodes_where(&LayerKey::new("Token"), "pos", &Value::from("IN"));
        assert_eq!(hits, vec![tokens[1]]);
    }

    #[test]
    fn missing_collection_scans_empty() {
        let (doc, _, _) = lund();
        let reader = DocumentReader::new(&doc);
        assert!(reader.nodes(&LayerKey::new("Sentence")).is_empty());
        assert!(reader.covered_by(&LayerKey::new("Sentence"), 0, 27).is_empty());
    }

    #[test]
    fn directed_neighbour_scans() {
        let (mut doc, tokens, _) = lund();
        let dep = LayerKey::new("Dep");
        doc.create_edge(dep.clone(), tokens[0], tokens[1]).unwrap();
        doc.create_edge(dep.clone(), tokens[1], tokens[2]).unwrap();
        // an edge in another collection must not leak into the scan
        doc.create_edge("Coref", tokens[1], tokens[3]).unwrap();

        let reader = DocumentReader::new(&doc);
        assert_eq!(
            reader
                .neighbours(tokens[1], &dep, Direction::Outgoing)
                .unwrap(),
            vec![tokens[2]]
        );
        assert_eq!(
            reader
                .neighbours(tokens[1], &dep, Direction::Incoming)
                .unwrap(),
            vec![tokens[0]]
        );
        let mut both = reader
            .neighbours(tokens[1], &dep, Direction::Both)
            .unwrap();
        both.sort();
        let mut expected = vec![tokens[0], tokens[2]];
        expected.sort();
        assert_eq!(both, expected);
    }

    #[test]
    fn projection_is_cycle_safe() {
        let mut doc = Document::new();
        let a = doc.create_node("Entity");
        let b = doc.create_node("Entity");
        let c = doc.create_node("Entity");
        let rel = LayerKey::new("Rel");
        doc.create_edge(rel.clone(), a, b).unwrap();
        doc.create_edge(rel.clone(), b, c).unwrap();
        doc.create_edge(rel.clone(), c, a).unwrap();

        let reader = DocumentReader::new(&doc);
        let mut reached = reader.project(a, &rel, Direction::Outgoing).unwrap();
        assert_eq!(reached[0], a);
        reached.sort();
        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(reached, expected);
    }

    #[test]
    fn projection_respects_direction() {
        let mut doc = Document::new();
        let a = doc.create_node("Entity");
        let b = doc.create_node("Entity");
        let c = doc.create_node("Entity");
        let rel = LayerKey::new("Rel");
        doc.create_edge(rel.clone(), a, b).unwrap();
        doc.create_edge(rel.clone(), c, b).unwrap();

        let reader = DocumentReader::new(&doc);
        let reached = reader.project(a, &rel, Direction::Outgoing).unwrap();
        assert_eq!(reached, vec![a, b]);
    }

    #[test]
    fn splice_then_scan_stays_consistent() {
        let (mut doc, _, _) = lund();
        doc.splice(15, 19, "Ystad", EmptySpans::Remove).unwrap();
        let reader = DocumentReader::new(&doc);
        let hits = reader.covered_by(&LayerKey::new("Token"), 0, doc.text().len());
        assert_eq!(hits.len(), 4);
    }
}
