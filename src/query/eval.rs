//! Backtracking query evaluation
//!
//! A query is an ordered list of predicates over variables introduced at
//! build time. Evaluation is depth-first: predicate 0 is entered, each
//! success advances the cursor, each exhaustion exits the predicate and
//! retreats. Every complete proposition is yielded lazily as a `Match`.
//!
//! There is no planner: **predicate declaration order is the join order**.
//! Reordering predicates never changes the result set, but it decides how
//! many candidate combinations are tried — put the most selective predicates
//! first. An unselective predicate ahead of everything else can make a query
//! run arbitrarily long.

use std::collections::HashMap;
use thiserror::Error;

use crate::graph::{AnyRef, Document};

use super::predicate::{Activation, Predicate};
use super::proposition::{Match, Proposition, Var};

/// Errors detected when a query is built, before any evaluation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query introduces no variables")]
    NoVariables,

    #[error("query has no predicates")]
    NoPredicates,

    #[error("predicate references variable v{0} that this query never introduced")]
    UnknownVar(usize),

    #[error("output variable v{0} is never bound by any predicate")]
    UnboundOutput(usize),
}

/// Result type for query compilation
pub type QueryResult<T> = Result<T, QueryError>;

/// Builder that introduces variables and collects predicates in join order.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    vars: usize,
    outputs: Option<Vec<Var>>,
    predicates: Vec<Predicate>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introduce the next variable slot.
    pub fn var(&mut self) -> Var {
        let var = Var(self.vars);
        self.vars += 1;
        var
    }

    /// Append a predicate. Declaration order is evaluation (join) order.
    pub fn pred(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    /// Restrict the output to the given variables. Defaults to every
    /// introduced variable.
    pub fn select(&mut self, outputs: impl IntoIterator<Item = Var>) -> &mut Self {
        self.outputs = Some(outputs.into_iter().collect());
        self
    }

    /// Validate and freeze the query.
    pub fn build(self) -> QueryResult<Query> {
        if self.vars == 0 {
            return Err(QueryError::NoVariables);
        }
        if self.predicates.is_empty() {
            return Err(QueryError::NoPredicates);
        }
        for predicate in &self.predicates {
            for var in predicate.vars() {
                if var.index() >= self.vars {
                    return Err(QueryError::UnknownVar(var.index()));
                }
            }
        }
        let outputs = self
            .outputs
            .unwrap_or_else(|| (0..self.vars).map(Var).collect());
        for &var in &outputs {
            if var.index() >= self.vars {
                return Err(QueryError::UnknownVar(var.index()));
            }
            let bound_somewhere = self
                .predicates
                .iter()
                .any(|p| p.vars().any(|v| v == var));
            if !bound_somewhere {
                return Err(QueryError::UnboundOutput(var.index()));
            }
        }
        Ok(Query {
            var_count: self.vars,
            outputs,
            predicates: self.predicates,
        })
    }
}

/// A compiled query: variables, outputs, and predicates in join order.
#[derive(Debug)]
pub struct Query {
    var_count: usize,
    outputs: Vec<Var>,
    predicates: Vec<Predicate>,
}

impl Query {
    /// Evaluate lazily against a document. The returned iterator may be
    /// abandoned at any point.
    pub fn execute<'a>(&'a self, doc: &'a Document) -> Hits<'a> {
        let prop = Proposition::new(self.var_count);
        let first = self.predicates[0].enter(doc, &prop);
        Hits {
            query: self,
            doc,
            prop,
            activations: vec![first],
            cursor: 0,
        }
    }

    /// The query's output variables.
    pub fn outputs(&self) -> &[Var] {
        &self.outputs
    }
}

/// Lazy stream of complete propositions.
///
/// The activation stack always holds one entry per entered predicate; the
/// cursor going negative means the whole search space is exhausted.
pub struct Hits<'a> {
    query: &'a Query,
    doc: &'a Document,
    prop: Proposition,
    activations: Vec<Activation>,
    cursor: isize,
}

impl Iterator for Hits<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if self.cursor < 0 {
                return None;
            }
            let p = self.cursor as usize;
            let predicate = &self.query.predicates[p];
            let activation = self.activations.last_mut()?;
            if predicate.next(self.doc, &mut self.prop, activation) {
                if p + 1 == self.query.predicates.len() {
                    // complete: yield a copy, stay at this depth to resume
                    if let Some(found) = Match::project(&self.prop, &self.query.outputs) {
                        return Some(found);
                    }
                } else {
                    let next = self.query.predicates[p + 1].enter(self.doc, &self.prop);
                    self.activations.push(next);
                    self.cursor += 1;
                }
            } else {
                predicate.exit(&mut self.prop, activation);
                self.activations.pop();
                self.cursor -= 1;
            }
        }
    }
}

impl Hits<'_> {
    /// Collect every match, ordered by the start offset of the annotation
    /// bound to `var` (unranged bindings sort last).
    pub fn sorted_by_start(self, var: Var) -> Vec<Match> {
        let doc = self.doc;
        let mut all: Vec<Match> = self.collect();
        all.sort_by_key(|found| {
            found
                .node(var)
                .and_then(|node| doc.range(node).ok().flatten())
                .unwrap_or((usize::MAX, usize::MAX))
        });
        all
    }

    /// Collect every match, grouped by the binding of `var`.
    pub fn grouped_by(self, var: Var) -> HashMap<AnyRef, Vec<Match>> {
        let mut groups: HashMap<AnyRef, Vec<Match>> = HashMap::new();
        for found in self {
            if let Some(binding) = found.get(var) {
                groups.entry(binding).or_default().push(found);
            }
        }
        groups
    }
}
