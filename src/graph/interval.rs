//! Interval index over annotation ranges
//!
//! One index exists per annotation collection. Entries are ordered by start
//! offset, ties broken by end offset and then by insertion sequence, so two
//! annotations with the same range keep a stable relative order for the whole
//! life of the index. Range reads relate each stored `[start, end)` range to a
//! query range `[from, to)`:
//!
//! - *covered-by*: `start >= from && end <= to`
//! - *overlapping*: `end > from && start < to`
//! - *covering*: overlapping and `start <= from && end >= to`

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

use super::refs::NodeRef;

/// Ordering key of one indexed annotation.
///
/// `seq` is a document-wide monotonic insertion counter; it makes every key
/// unique and gives equal ranges their insertion-order tie-break. Re-ranging
/// an annotation keeps its original `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanKey {
    pub start: usize,
    pub end: usize,
    pub(crate) seq: u64,
}

impl SpanKey {
    /// Smallest possible key with the given start offset.
    fn lower(start: usize) -> Self {
        SpanKey {
            start,
            end: 0,
            seq: 0,
        }
    }

    /// Largest possible key with the given start offset.
    fn upper(start: usize) -> Self {
        SpanKey {
            start,
            end: usize::MAX,
            seq: u64::MAX,
        }
    }
}

/// Start-ordered index of ranged nodes within one collection.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    entries: BTreeMap<SpanKey, NodeRef>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, key: SpanKey, node: NodeRef) {
        self.entries.insert(key, node);
    }

    pub(crate) fn remove(&mut self, key: &SpanKey) -> Option<NodeRef> {
        self.entries.remove(key)
    }

    /// Move an entry to a new range, keeping its insertion sequence.
    pub(crate) fn reindex(&mut self, old: &SpanKey, start: usize, end: usize) -> Option<SpanKey> {
        let node = self.entries.remove(old)?;
        let key = SpanKey {
            start,
            end,
            seq: old.seq,
        };
        self.entries.insert(key, node);
        Some(key)
    }

    /// All entries in start order.
    pub fn iter(&self) -> impl Iterator<Item = (SpanKey, NodeRef)> + '_ {
        self.entries.iter().map(|(k, n)| (*k, *n))
    }

    /// Entries with `start >= from && end <= to`.
    pub fn covered_by(
        &self,
        from: usize,
        to: usize,
    ) -> impl Iterator<Item = (SpanKey, NodeRef)> + '_ {
        self.entries
            .range(SpanKey::lower(from)..)
            .take_while(move |(k, _)| k.start <= to)
            .filter(move |(k, _)| k.end <= to)
            .map(|(k, n)| (*k, *n))
    }

    /// Entries with `end > from && start < to`.
    pub fn overlapping(
        &self,
        from: usize,
        to: usize,
    ) -> impl Iterator<Item = (SpanKey, NodeRef)> + '_ {
        self.entries
            .range(..SpanKey::lower(to))
            .filter(move |(k, _)| k.end > from)
            .map(|(k, n)| (*k, *n))
    }

    /// Overlapping entries that also satisfy `start <= from && end >= to`.
    pub fn covering(
        &self,
        from: usize,
        to: usize,
    ) -> impl Iterator<Item = (SpanKey, NodeRef)> + '_ {
        self.entries
            .range(..=SpanKey::upper(from))
            .filter(move |(k, _)| k.end > from && k.start < to && k.end >= to)
            .map(|(k, n)| (*k, *n))
    }

    /// A fresh forward scan over the index.
    pub fn navigator(&self) -> SpanNavigator<'_> {
        SpanNavigator {
            index: self,
            current: None,
        }
    }
}

/// Positional navigator: one forward pass over start-ordered entries.
///
/// No entry is revisited once passed; `reset` restarts the scan. Positional
/// accessors may only be called after a successful advance.
#[derive(Debug, Clone)]
pub struct SpanNavigator<'a> {
    index: &'a IntervalIndex,
    current: Option<(SpanKey, NodeRef)>,
}

impl<'a> SpanNavigator<'a> {
    /// Advance to the next entry. Returns false when the scan is exhausted.
    pub fn next(&mut self) -> bool {
        let found = match self.current {
            None => self.index.entries.iter().next(),
            Some((key, _)) => self.index.entries.range((Excluded(key), Unbounded)).next(),
        };
        self.step(found)
    }

    /// Advance to the first remaining entry with `start >= pos`.
    pub fn next_from(&mut self, pos: usize) -> bool {
        let bound = match self.current {
            Some((key, _)) if key >= SpanKey::lower(pos) => Excluded(key),
            _ => Included(SpanKey::lower(pos)),
        };
        let found = self.index.entries.range((bound, Unbounded)).next();
        self.step(found)
    }

    /// Advance to the first remaining entry with `end > pos`.
    pub fn next_floor(&mut self, pos: usize) -> bool {
        let bound = match self.current {
            None => Unbounded,
            Some((key, _)) => Excluded(key),
        };
        let found = self
            .index
            .entries
            .range((bound, Unbounded))
            .find(|(k, _)| k.end > pos);
        self.step(found)
    }

    /// Restart the scan from the beginning.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Whether a positional read is currently legal.
    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    /// The node at the current position.
    pub fn current(&self) -> NodeRef {
        self.expect_current().1
    }

    /// Start offset of the current entry.
    pub fn start(&self) -> usize {
        self.expect_current().0.start
    }

    /// End offset of the current entry.
    pub fn end(&self) -> usize {
        self.expect_current().0.end
    }

    /// Full ordering key of the current entry.
    pub fn key(&self) -> SpanKey {
        self.expect_current().0
    }

    fn step(&mut self, found: Option<(&SpanKey, &NodeRef)>) -> bool {
        match found {
            Some((key, node)) => {
                self.current = Some((*key, *node));
                true
            }
            None => false,
        }
    }

    fn expect_current(&self) -> (SpanKey, NodeRef) {
        self.current
            .expect("span navigator read before a successful advance")
    }
}
