//! Variable bindings: the shared state of one query evaluation
//!
//! A variable is a slot index fixed when the query is built. The proposition
//! is the single mutable binding array every predicate reads and writes
//! during evaluation; completed results are copied out as immutable `Match`
//! values before the evaluator backtracks.

use crate::graph::{AnyRef, EdgeRef, NodeRef};

/// A query variable: an index into the proposition's slot array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub(crate) usize);

impl Var {
    /// The slot index this variable was assigned at build time.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The current partial (or complete) result of a query: one optional binding
/// per variable slot.
#[derive(Debug, Clone)]
pub struct Proposition {
    slots: Vec<Option<AnyRef>>,
}

impl Proposition {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Number of variable slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the slot currently holds a binding.
    pub fn is_bound(&self, var: Var) -> bool {
        self.slots.get(var.0).is_some_and(|slot| slot.is_some())
    }

    /// The slot's binding, if any.
    pub fn get(&self, var: Var) -> Option<AnyRef> {
        self.slots.get(var.0).copied().flatten()
    }

    /// The bound node, if the slot holds a node.
    pub fn node(&self, var: Var) -> Option<NodeRef> {
        self.get(var).and_then(|b| b.as_node())
    }

    /// The bound edge, if the slot holds an edge.
    pub fn edge(&self, var: Var) -> Option<EdgeRef> {
        self.get(var).and_then(|b| b.as_edge())
    }

    pub(crate) fn bind(&mut self, var: Var, binding: AnyRef) {
        if let Some(slot) = self.slots.get_mut(var.0) {
            *slot = Some(binding);
        }
    }

    pub(crate) fn unbind(&mut self, var: Var) {
        if let Some(slot) = self.slots.get_mut(var.0) {
            *slot = None;
        }
    }
}

/// One complete query result: the output variables and their bindings,
/// detached from the evaluator's mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    bindings: Vec<(Var, AnyRef)>,
}

impl Match {
    pub(crate) fn project(prop: &Proposition, outputs: &[Var]) -> Option<Self> {
        let mut bindings = Vec::with_capacity(outputs.len());
        for &var in outputs {
            bindings.push((var, prop.get(var)?));
        }
        Some(Self { bindings })
    }

    /// The binding of an output variable.
    pub fn get(&self, var: Var) -> Option<AnyRef> {
        self.bindings
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, b)| *b)
    }

    /// The bound node of an output variable.
    pub fn node(&self, var: Var) -> Option<NodeRef> {
        self.get(var).and_then(|b| b.as_node())
    }

    /// The bound edge of an output variable.
    pub fn edge(&self, var: Var) -> Option<EdgeRef> {
        self.get(var).and_then(|b| b.as_edge())
    }

    /// All output bindings in declaration order.
    pub fn bindings(&self) -> &[(Var, AnyRef)] {
        &self.bindings
    }
}
