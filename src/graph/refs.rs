//! Generation-checked handles to node and edge records
//!
//! A handle is a slot index plus the generation the slot had when the entity
//! was created. Removing an entity bumps the slot's generation, so every
//! handle that pointed at it stops resolving. Handles stay valid across
//! property, range, variant and layer mutation.

use std::fmt;

/// Handle to a node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub(crate) slot: u32,
    pub(crate) gen: u32,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}.{}", self.slot, self.gen)
    }
}

/// Handle to an edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeRef {
    pub(crate) slot: u32,
    pub(crate) gen: u32,
}

impl fmt::Display for EdgeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}.{}", self.slot, self.gen)
    }
}

/// Either kind of handle; the binding payload of query variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnyRef {
    Node(NodeRef),
    Edge(EdgeRef),
}

impl AnyRef {
    /// The node handle, if this binds a node.
    pub fn as_node(&self) -> Option<NodeRef> {
        match self {
            AnyRef::Node(n) => Some(*n),
            AnyRef::Edge(_) => None,
        }
    }

    /// The edge handle, if this binds an edge.
    pub fn as_edge(&self) -> Option<EdgeRef> {
        match self {
            AnyRef::Edge(e) => Some(*e),
            AnyRef::Node(_) => None,
        }
    }
}

impl From<NodeRef> for AnyRef {
    fn from(n: NodeRef) -> Self {
        AnyRef::Node(n)
    }
}

impl From<EdgeRef> for AnyRef {
    fn from(e: EdgeRef) -> Self {
        AnyRef::Edge(e)
    }
}

impl fmt::Display for AnyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyRef::Node(n) => n.fmt(f),
            AnyRef::Edge(e) => e.fmt(f),
        }
    }
}
