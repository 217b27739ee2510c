//! Query system: derived reads and the backtracking constraint engine
//!
//! `DocumentReader` provides the read facade predicates draw candidates
//! from; `QueryBuilder`/`Query` run conjunctions of predicates by
//! depth-first backtracking over a shared proposition.

mod combination;
mod eval;
mod predicate;
mod proposition;
mod reader;
mod types;

pub use eval::{Hits, Query, QueryBuilder, QueryError, QueryResult};
pub use predicate::{CandidateSource, Predicate, VarSpec};
pub use proposition::{Match, Proposition, Var};
pub use reader::DocumentReader;
pub use types::Direction;
