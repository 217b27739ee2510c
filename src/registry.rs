//! Wrapper registry: layer name to user-facing representation
//!
//! Maps layer names to factories producing typed wrapper objects around node
//! handles, with a generic fallback for unregistered layers. Wrappers are
//! cached per node against the document epoch, so a layer migration forces
//! re-materialization. The cache assumes a single writer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::{Document, NodeRef, StoreResult};

/// A user-facing view over one node.
pub trait LayerWrapper: Any {
    /// The wrapped node handle.
    fn node(&self) -> NodeRef;

    /// Name of the layer the wrapper was built for.
    fn layer_name(&self) -> &str;

    /// Downcast support for typed wrappers.
    fn as_any(&self) -> &dyn Any;
}

/// Fallback wrapper used when no factory is registered for a layer.
#[derive(Debug, Clone)]
pub struct GenericWrapper {
    node: NodeRef,
    layer: String,
}

impl GenericWrapper {
    pub fn new(node: NodeRef, layer: impl Into<String>) -> Self {
        Self {
            node,
            layer: layer.into(),
        }
    }
}

impl LayerWrapper for GenericWrapper {
    fn node(&self) -> NodeRef {
        self.node
    }

    fn layer_name(&self) -> &str {
        &self.layer
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Factory = Box<dyn Fn(NodeRef) -> Arc<dyn LayerWrapper>>;

struct CachedWrapper {
    epoch: u64,
    wrapper: Arc<dyn LayerWrapper>,
}

/// Registry of wrapper factories keyed by layer name.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
    cache: HashMap<NodeRef, CachedWrapper>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a layer name, replacing any previous one.
    pub fn register(
        &mut self,
        layer: impl Into<String>,
        factory: impl Fn(NodeRef) -> Arc<dyn LayerWrapper> + 'static,
    ) {
        self.factories.insert(layer.into(), Box::new(factory));
    }

    /// Whether a specific factory is registered for this layer name.
    pub fn has_factory(&self, layer: &str) -> bool {
        self.factories.contains_key(layer)
    }

    /// Produce (or fetch the cached) wrapper for a node. The cache entry is
    /// discarded when the document epoch has moved since it was built.
    pub fn wrap(&mut self, doc: &Document, node: NodeRef) -> StoreResult<Arc<dyn LayerWrapper>> {
        let layer = doc.node_layer_of(node)?.layer.clone();
        let epoch = doc.epoch();
        if let Some(cached) = self.cache.get(&node) {
            if cached.epoch == epoch {
                return Ok(Arc::clone(&cached.wrapper));
            }
        }
        let wrapper: Arc<dyn LayerWrapper> = match self.factories.get(&layer) {
            Some(factory) => factory(node),
            None => Arc::new(GenericWrapper::new(node, layer)),
        };
        self.cache.insert(
            node,
            CachedWrapper {
                epoch,
                wrapper: Arc::clone(&wrapper),
            },
        );
        Ok(wrapper)
    }

    /// Drop one cached wrapper.
    pub fn invalidate(&mut self, node: NodeRef) {
        self.cache.remove(&node);
    }

    /// Drop every cached wrapper.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
