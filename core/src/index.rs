use std::collections::BTreeMap;

use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::postings::PostingsList;

pub type DocId = u32;

/// The postings and documents accumulated by one build run.
///
/// Owned by the run and handed to [`crate::persist::IndexStore::flush`]; nothing
/// here is visible to readers until that flush commits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildResult {
    /// First id the run asked for.
    pub start_id: DocId,
    pub last_processed_id: Option<DocId>,
    pub postings: BTreeMap<String, PostingsList>,
    pub documents: BTreeMap<DocId, Document>,
}

impl BuildResult {
    pub fn new(start_id: DocId) -> Self {
        Self { start_id, ..Self::default() }
    }

    /// Add a document and its terms. Re-adding an id overwrites the document
    /// and leaves postings unchanged.
    pub fn add_document(&mut self, doc: Document) {
        let id = doc.id;
        for term in &doc.terms() {
            match self.postings.get_mut(term) {
                Some(list) => {
                    list.insert(id);
                }
                None => {
                    let mut list = PostingsList::new();
                    list.insert(id);
                    self.postings.insert(term.to_string(), list);
                }
            }
        }
        self.last_processed_id = Some(self.last_processed_id.map_or(id, |last| last.max(id)));
        self.documents.insert(id, doc);
    }

    /// Cursor value to persist: one past the last processed id, or the start id if nothing was processed.
    pub fn next_cursor(&self) -> Result<DocId> {
        match self.last_processed_id {
            None => Ok(self.start_id),
            Some(id) => next_id(id),
        }
    }

    pub fn processed(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// `id + 1`, or a `Corrupt` error once the id space is exhausted.
pub fn next_id(id: DocId) -> Result<DocId> {
    id.checked_add(1)
        .ok_or_else(|| IndexError::Corrupt(format!("document id space exhausted after {id}")))
}
