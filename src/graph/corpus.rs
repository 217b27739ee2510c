//! Corpus: the set of documents managed by one process
//!
//! Individual documents are single-writer; the corpus map itself is safe to
//! share between threads.

use dashmap::DashMap;
use uuid::Uuid;

use super::document::Document;

/// All documents managed by this corpus, keyed by document id.
#[derive(Debug, Default)]
pub struct Corpus {
    documents: DashMap<Uuid, Document>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Insert or replace a document. Returns the document id.
    pub fn upsert(&self, document: Document) -> Uuid {
        let id = document.id();
        self.documents.insert(id, document);
        id
    }

    /// Get a copy of a document by id.
    pub fn get(&self, id: &Uuid) -> Option<Document> {
        self.documents.get(id).map(|d| d.clone())
    }

    /// Remove a document.
    pub fn remove(&self, id: &Uuid) -> Option<Document> {
        self.documents.remove(id).map(|(_, doc)| doc)
    }

    /// List all document ids.
    pub fn list(&self) -> Vec<Uuid> {
        self.documents.iter().map(|d| *d.key()).collect()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether a document with this id exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.documents.contains_key(id)
    }
}
