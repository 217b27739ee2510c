//! Core store: layered node/edge collections over a text buffer

mod collection;
mod corpus;
mod document;
mod interval;
mod layer;
mod refs;
mod value;


pub use collection::{EdgeLayer, NodeLayer};
pub use corpus::Corpus;
pub use document::{Document, DocumentMeta, EmptySpans, StoreError, StoreResult};
pub use interval::{IntervalIndex, SpanKey, SpanNavigator};
pub use layer::LayerKey;
pub use refs::{AnyRef, EdgeRef, NodeRef};
pub use value::{Properties, Value};
