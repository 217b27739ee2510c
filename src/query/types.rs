//! Shared query types

/// Direction for edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow outgoing edges (tail -> head)
    #[default]
    Outgoing,
    /// Follow incoming edges (head <- tail)
    Incoming,
    /// Follow edges in both directions
    Both,
}
