//! Stratum: Layered Annotation Graph Store
//!
//! An in-memory graph store for textual documents — typed nodes (optionally
//! anchored to a `[start, end)` text range) and typed edges, grouped into
//! named layers and variants — plus a backtracking constraint engine that
//! finds every variable binding satisfying a conjunction of graph predicates.
//!
//! # Core Concepts
//!
//! - **Annotations**: nodes with a text range, kept in a start-ordered
//!   interval index per collection
//! - **Layers/Variants**: one collection per (layer, variant) key, created
//!   lazily and dropped when empty
//! - **Queries**: predicates over variables, evaluated depth-first in
//!   declaration order over a shared proposition
//!
//! # Example
//!
//! ```
//! use stratum::Document;
//!
//! let mut doc = Document::with_text("Greetings from Lund");
//! let token = doc.create_annotation("Token", 15, 19).unwrap();
//! assert_eq!(doc.covered_text(token).unwrap(), Some("Lund"));
//! ```

mod graph;
pub mod query;
mod registry;
mod snapshot;

pub use graph::{
    AnyRef, Corpus, Document, DocumentMeta, EdgeLayer, EdgeRef, EmptySpans, IntervalIndex,
    LayerKey, NodeLayer, NodeRef, Properties, SpanKey, SpanNavigator, StoreError, StoreResult,
    Value,
};
pub use query::{
    Direction, DocumentReader, Hits, Match, Predicate, Proposition, Query, QueryBuilder,
    QueryError, QueryResult, Var, VarSpec,
};
pub use registry::{GenericWrapper, LayerWrapper, TypeRegistry};
pub use snapshot::{
    AnnotationSnapshot, DocumentSnapshot, EdgeLayerSnapshot, EdgeSnapshot, NodeLayerSnapshot,
    NodeSnapshot, SnapshotError, SnapshotResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
