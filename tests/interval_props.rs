//! Randomized interval-index properties against a brute-force reference

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stratum::{Document, DocumentReader, LayerKey, NodeRef};

const TEXT_LEN: usize = 100;
const SPANS_PER_DOC: usize = 40;
const QUERIES_PER_DOC: usize = 50;

struct RandomDoc {
    doc: Document,
    spans: Vec<(NodeRef, usize, usize)>,
}

fn random_doc(rng: &mut StdRng) -> RandomDoc {
    let mut doc = Document::with_text("x".repeat(TEXT_LEN));
    let mut spans = Vec::with_capacity(SPANS_PER_DOC);
    for _ in 0..SPANS_PER_DOC {
        let start = rng.gen_range(0..=TEXT_LEN);
        let end = rng.gen_range(start..=TEXT_LEN);
        let node = doc.create_annotation("Span", start, end).unwrap();
        spans.push((node, start, end));
    }
    RandomDoc { doc, spans }
}

fn random_query(rng: &mut StdRng) -> (usize, usize) {
    let from = rng.gen_range(0..=TEXT_LEN);
    let to = rng.gen_range(from..=TEXT_LEN);
    (from, to)
}

fn sorted(mut refs: Vec<NodeRef>) -> Vec<NodeRef> {
    refs.sort();
    refs
}

#[test]
fn covered_by_matches_brute_force() {
    let key = LayerKey::new("Span");
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let fixture = random_doc(&mut rng);
        let reader = DocumentReader::new(&fixture.doc);
        for _ in 0..QUERIES_PER_DOC {
            let (from, to) = random_query(&mut rng);
            let expected: Vec<NodeRef> = fixture
                .spans
                .iter()
                .filter(|&&(_, start, end)| start >= from && end <= to)
                .map(|&(node, _, _)| node)
                .collect();
            let actual = reader.covered_by(&key, from, to);
            assert_eq!(
                sorted(actual),
                sorted(expected),
                "covered_by [{from}, {to}) diverged at seed {seed}"
            );
        }
    }
}

#[test]
fn overlapping_matches_brute_force() {
    let key = LayerKey::new("Span");
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let fixture = random_doc(&mut rng);
        let reader = DocumentReader::new(&fixture.doc);
        for _ in 0..QUERIES_PER_DOC {
            let (from, to) = random_query(&mut rng);
            let expected: Vec<NodeRef> = fixture
                .spans
                .iter()
                .filter(|&&(_, start, end)| end > from && start < to)
                .map(|&(node, _, _)| node)
                .collect();
            let actual = reader.overlapping(&key, from, to);
            assert_eq!(
                sorted(actual),
                sorted(expected),
                "overlapping [{from}, {to}) diverged at seed {seed}"
            );
        }
    }
}

#[test]
fn covering_matches_brute_force() {
    let key = LayerKey::new("Span");
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let fixture = random_doc(&mut rng);
        let reader = DocumentReader::new(&fixture.doc);
        for _ in 0..QUERIES_PER_DOC {
            let (from, to) = random_query(&mut rng);
            let expected: Vec<NodeRef> = fixture
                .spans
                .iter()
                .filter(|&&(_, start, end)| {
                    end > from && start < to && start <= from && end >= to
                })
                .map(|&(node, _, _)| node)
                .collect();
            let actual = reader.covering(&key, from, to);
            assert_eq!(
                sorted(actual),
                sorted(expected),
                "covering [{from}, {to}) diverged at seed {seed}"
            );
        }
    }
}

#[test]
fn navigator_scan_is_monotone_and_complete() {
    let key = LayerKey::new("Span");
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let fixture = random_doc(&mut rng);
        let index = fixture
            .doc
            .node_collection(&key)
            .expect("collection exists")
            .annotations();

        let mut nav = index.navigator();
        let mut visited = Vec::new();
        let mut last_start = 0usize;
        while nav.next() {
            assert!(nav.start() >= last_start, "starts went backwards");
            last_start = nav.start();
            visited.push(nav.current());
        }
        assert_eq!(visited.len(), fixture.spans.len(), "entry visited twice or skipped");

        // the full scan equals covered-by over the whole axis
        let reader = DocumentReader::new(&fixture.doc);
        let everything = reader.covered_by(&key, 0, usize::MAX);
        assert_eq!(sorted(visited), sorted(everything));
    }
}

#[test]
fn navigator_floor_seek_matches_filter() {
    let key = LayerKey::new("Span");
    let mut rng = StdRng::seed_from_u64(42);
    let fixture = random_doc(&mut rng);
    let index = fixture
        .doc
        .node_collection(&key)
        .expect("collection exists")
        .annotations();

    let pos = 50;
    let mut nav = index.navigator();
    let mut reached = Vec::new();
    while nav.next_floor(pos) {
        assert!(nav.end() > pos);
        reached.push(nav.current());
    }
    let expected: Vec<NodeRef> = fixture
        .spans
        .iter()
        .filter(|&&(_, _, end)| end > pos)
        .map(|&(node, _, _)| node)
        .collect();
    assert_eq!(sorted(reached), sorted(expected));
}
