//! Shared document builders for integration tests

use stratum::{Document, NodeRef};

/// The Lund document: four tokens and one Location entity over
/// "Lund  Sweden".
pub struct LundDocument {
    pub doc: Document,
    pub tokens: Vec<NodeRef>,
    pub location: NodeRef,
}

pub fn lund_document() -> LundDocument {
    let mut doc = Document::with_text("Greetings from Lund  Sweden");
    let tokens = vec![
        doc.create_annotation("Token", 0, 9).unwrap(),
        doc.create_annotation("Token", 10, 14).unwrap(),
        doc.create_annotation("Token", 15, 19).unwrap(),
        doc.create_annotation("Token", 21, 27).unwrap(),
    ];
    let location = doc.create_annotation("NamedEntity", 15, 27).unwrap();
    doc.set_node_property(location, "type", "Location").unwrap();
    LundDocument {
        doc,
        tokens,
        location,
    }
}
