//! Layer keys: (layer, variant) addressing for node and edge collections

use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses one node or edge collection within a document.
///
/// A layer groups entities of one conceptual type (e.g. `"Token"`); the
/// optional variant subdivides it (e.g. alternate tokenizations). A document
/// holds exactly one collection per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerKey {
    /// Layer name
    pub layer: String,
    /// Optional sub-partition within the layer
    pub variant: Option<String>,
}

impl LayerKey {
    /// Create a key for the default (variant-less) partition of a layer.
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            variant: None,
        }
    }

    /// Create a key for a named variant of a layer.
    pub fn with_variant(layer: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            variant: Some(variant.into()),
        }
    }

    /// The same layer under a different variant.
    pub fn in_variant(&self, variant: Option<String>) -> Self {
        Self {
            layer: self.layer.clone(),
            variant,
        }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(v) => write!(f, "{}@{}", self.layer, v),
            None => write!(f, "{}", self.layer),
        }
    }
}

impl From<&str> for LayerKey {
    fn from(layer: &str) -> Self {
        Self::new(layer)
    }
}

impl From<String> for LayerKey {
    fn from(layer: String) -> Self {
        Self::new(layer)
    }
}
