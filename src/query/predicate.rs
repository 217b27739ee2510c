//! Predicates: one constraint clause over one or more query variables
//!
//! A predicate owns the ordered list of variables it constrains, one
//! candidate source per variable, and a boolean test over the shared
//! proposition. Activation follows a three-phase protocol driven by the
//! evaluator:
//!
//! 1. `enter` records which variables are already bound by earlier
//!    predicates. If all are, no odometer is built and the predicate
//!    degenerates to a single boolean check.
//! 2. `next` pulls candidate combinations until one passes the test, binding
//!    this predicate's unbound slots as a side effect.
//! 3. `exit` unbinds exactly the slots this predicate bound, restoring the
//!    proposition for backtracking.

use std::fmt;

use crate::graph::{AnyRef, Document, LayerKey, Value};

use super::combination::Combinations;
use super::proposition::{Proposition, Var};
use super::reader::DocumentReader;

/// Where a variable's syntactically valid candidates come from.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// Every node of a collection, pure members included.
    Nodes(LayerKey),
    /// Only the ranged members of a collection.
    Annotations(LayerKey),
    /// Every edge of a collection.
    Edges(LayerKey),
}

/// One constrained variable: its slot and its candidate source.
#[derive(Debug, Clone)]
pub struct VarSpec {
    pub(crate) var: Var,
    source: CandidateSource,
}

impl VarSpec {
    /// Candidates are all nodes of the collection.
    pub fn nodes(var: Var, key: impl Into<LayerKey>) -> Self {
        Self {
            var,
            source: CandidateSource::Nodes(key.into()),
        }
    }

    /// Candidates are the collection's annotations only.
    pub fn annotations(var: Var, key: impl Into<LayerKey>) -> Self {
        Self {
            var,
            source: CandidateSource::Annotations(key.into()),
        }
    }

    /// Candidates are all edges of the collection.
    pub fn edges(var: Var, key: impl Into<LayerKey>) -> Self {
        Self {
            var,
            source: CandidateSource::Edges(key.into()),
        }
    }

    fn candidates(&self, doc: &Document) -> Vec<AnyRef> {
        let reader = DocumentReader::new(doc);
        match &self.source {
            CandidateSource::Nodes(key) => {
                reader.nodes(key).into_iter().map(AnyRef::Node).collect()
            }
            CandidateSource::Annotations(key) => reader
                .annotations(key)
                .into_iter()
                .map(AnyRef::Node)
                .collect(),
            CandidateSource::Edges(key) => {
                reader.edges(key).into_iter().map(AnyRef::Edge).collect()
            }
        }
    }
}

type Test = Box<dyn Fn(&Document, &Proposition) -> bool>;

/// One query clause: constrained variables plus the relational test.
pub struct Predicate {
    vars: Vec<VarSpec>,
    test: Test,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("vars", &self.vars).finish()
    }
}

impl Predicate {
    /// A predicate from explicit variable specs and an arbitrary test.
    pub fn filter(
        vars: Vec<VarSpec>,
        test: impl Fn(&Document, &Proposition) -> bool + 'static,
    ) -> Self {
        Self {
            vars,
            test: Box::new(test),
        }
    }

    /// `inner`'s range lies within `outer`'s range.
    pub fn covered_by(inner: VarSpec, outer: VarSpec) -> Self {
        let (iv, ov) = (inner.var, outer.var);
        Self::filter(vec![inner, outer], move |doc, prop| {
            let (Some(i), Some(o)) = (prop.node(iv), prop.node(ov)) else {
                return false;
            };
            match (doc.range(i), doc.range(o)) {
                (Ok(Some((istart, iend))), Ok(Some((ostart, oend)))) => {
                    istart >= ostart && iend <= oend
                }
                _ => false,
            }
        })
    }

    /// The two ranges intersect.
    pub fn overlapping(a: VarSpec, b: VarSpec) -> Self {
        let (av, bv) = (a.var, b.var);
        Self::filter(vec![a, b], move |doc, prop| {
            let (Some(a), Some(b)) = (prop.node(av), prop.node(bv)) else {
                return false;
            };
            match (doc.range(a), doc.range(b)) {
                (Ok(Some((astart, aend))), Ok(Some((bstart, bend)))) => {
                    aend > bstart && astart < bend
                }
                _ => false,
            }
        })
    }

    /// The edge runs from `tail` to `head`.
    pub fn connects(edge: VarSpec, tail: VarSpec, head: VarSpec) -> Self {
        let (ev, tv, hv) = (edge.var, tail.var, head.var);
        Self::filter(vec![edge, tail, head], move |doc, prop| {
            let (Some(e), Some(t), Some(h)) = (prop.edge(ev), prop.node(tv), prop.node(hv))
            else {
                return false;
            };
            doc.edge_ends(e).map(|ends| ends == (t, h)).unwrap_or(false)
        })
    }

    /// The bound entity holds an exact property value.
    pub fn property_equals(spec: VarSpec, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let var = spec.var;
        let key = key.into();
        let value = value.into();
        Self::filter(vec![spec], move |doc, prop| {
            let props = match prop.get(var) {
                Some(AnyRef::Node(n)) => doc.node_properties(n),
                Some(AnyRef::Edge(e)) => doc.edge_properties(e),
                None => return false,
            };
            props
                .map(|p| p.get(&key) == Some(&value))
                .unwrap_or(false)
        })
    }

    /// The variables this predicate constrains, in declaration order.
    pub(crate) fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars.iter().map(|spec| spec.var)
    }

    /// Phase 1: inspect the proposition and set up candidate iteration for
    /// the still-unbound variables.
    pub(crate) fn enter(&self, doc: &Document, prop: &Proposition) -> Activation {
        let unbound: Vec<&VarSpec> = self
            .vars
            .iter()
            .filter(|spec| !prop.is_bound(spec.var))
            .collect();
        if unbound.is_empty() {
            return Activation {
                unbound: Vec::new(),
                combos: None,
                fired: false,
            };
        }
        let candidates = unbound.iter().map(|spec| spec.candidates(doc)).collect();
        Activation {
            unbound: unbound.into_iter().map(|spec| spec.var).collect(),
            combos: Some(Combinations::new(candidates)),
            fired: false,
        }
    }

    /// Phase 2: advance to the next satisfying binding. Returns false when
    /// this activation is exhausted.
    pub(crate) fn next(
        &self,
        doc: &Document,
        prop: &mut Proposition,
        activation: &mut Activation,
    ) -> bool {
        match activation.combos.as_mut() {
            None => {
                // all variables were constants: a single boolean check
                if activation.fired {
                    return false;
                }
                activation.fired = true;
                (self.test)(doc, prop)
            }
            Some(combos) => {
                while let Some(combo) = combos.next() {
                    for (&var, &binding) in activation.unbound.iter().zip(combo.iter()) {
                        prop.bind(var, binding);
                    }
                    if (self.test)(doc, prop) {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Phase 3: unbind the slots this predicate bound, leaving constants
    /// alone.
    pub(crate) fn exit(&self, prop: &mut Proposition, activation: &Activation) {
        for &var in &activation.unbound {
            prop.unbind(var);
        }
    }
}

/// Per-activation state: which variables this predicate binds, and the
/// odometer over their candidates (absent on the degenerate all-constant
/// path).
#[derive(Debug)]
pub(crate) struct Activation {
    unbound: Vec<Var>,
    combos: Option<Combinations>,
    fired: bool,
}

impl Activation {
    /// Whether this activation skipped building an odometer.
    #[cfg(test)]
    pub(crate) fn is_degenerate(&self) -> bool {
        self.combos.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Document;

    fn doc_with_tokens() -> (Document, Vec<crate::graph::NodeRef>) {
        let mut doc = Document::with_text("aa bb cc");
        let tokens = vec![
            doc.create_annotation("Token", 0, 2).unwrap(),
            doc.create_annotation("Token", 3, 5).unwrap(),
            doc.create_annotation("Token", 6, 8).unwrap(),
        ];
        (doc, tokens)
    }

    #[test]
    fn unbound_variables_are_iterated() {
        let (doc, tokens) = doc_with_tokens();
        let x = Var(0);
        let pred = Predicate::filter(
            vec![VarSpec::annotations(x, "Token")],
            move |doc, prop| {
                prop.node(x)
                    .and_then(|n| doc.range(n).ok().flatten())
                    .is_some_and(|(start, _)| start >= 3)
            },
        );
        let mut prop = Proposition::new(1);
        let mut act = pred.enter(&doc, &prop);
        assert!(!act.is_degenerate());

        assert!(pred.next(&doc, &mut prop, &mut act));
        assert_eq!(prop.node(x), Some(tokens[1]));
        assert!(pred.next(&doc, &mut prop, &mut act));
        assert_eq!(prop.node(x), Some(tokens[2]));
        assert!(!pred.next(&doc, &mut prop, &mut act));

        pred.exit(&mut prop, &act);
        assert!(!prop.is_bound(x));
    }

    #[test]
    fn all_constant_predicate_degenerates_to_one_check() {
        let (doc, tokens) = doc_with_tokens();
        let x = Var(0);
        let pred = Predicate::property_equals(VarSpec::annotations(x, "Token"), "pos", "NN");

        let mut prop = Proposition::new(1);
        prop.bind(x, AnyRef::Node(tokens[0]));
        let mut act = pred.enter(&doc, &prop);
        assert!(act.is_degenerate());

        // tokens[0] has no "pos" property: the single check fails
        assert!(!pred.next(&doc, &mut prop, &mut act));
        // and the constant binding survives exit
        pred.exit(&mut prop, &act);
        assert!(prop.is_bound(x));
    }

    #[test]
    fn degenerate_predicate_succeeds_at_most_once() {
        let (mut doc, tokens) = doc_with_tokens();
        doc.set_node_property(tokens[0], "pos", "NN").unwrap();
        let x = Var(0);
        let pred = Predicate::property_equals(VarSpec::annotations(x, "Token"), "pos", "NN");

        let mut prop = Proposition::new(1);
        prop.bind(x, AnyRef::Node(tokens[0]));
        let mut act = pred.enter(&doc, &prop);
        assert!(pred.next(&doc, &mut prop, &mut act));
        assert!(!pred.next(&doc, &mut prop, &mut act));
    }

    #[test]
    fn covered_by_constrains_ranges() {
        let (mut doc, tokens) = doc_with_tokens();
        let span = doc.create_annotation("Span", 3, 8).unwrap();
        let t = Var(0);
        let s = Var(1);
        let pred = Predicate::covered_by(
            VarSpec::annotations(t, "Token"),
            VarSpec::annotations(s, "Span"),
        );

        let mut prop = Proposition::new(2);
        prop.bind(s, AnyRef::Node(span));
        let mut act = pred.enter(&doc, &prop);

        let mut found = Vec::new();
        while pred.next(&doc, &mut prop, &mut act) {
            found.push(prop.node(t).unwrap());
        }
        assert_eq!(found, vec![tokens[1], tokens[2]]);
        pred.exit(&mut prop, &act);
        assert!(!prop.is_bound(t));
        assert!(prop.is_bound(s));
    }
}
