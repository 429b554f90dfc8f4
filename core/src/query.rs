use std::collections::HashSet;

use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::persist::{abort, IndexStore, Snapshot, TxResult};
use crate::DocId;

/// Split a query into distinct terms, in first-seen order.
///
/// Terms are matched verbatim: no lowercasing or punctuation stripping, so a
/// punctuated query term will not match anything in the index.
pub fn parse_query(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    text.split_whitespace().filter(|term| seen.insert(*term)).collect()
}

/// Intersect two ascending, duplicate-free id lists.
///
/// `reference` should be the shorter list. Scanning `other` stops as soon as it
/// passes the largest id in `reference`. The result is ascending.
pub fn intersect<'a, I>(reference: &[DocId], other: I) -> Vec<DocId>
where
    I: IntoIterator<Item = &'a DocId>,
{
    let Some(&max) = reference.last() else {
        return Vec::new();
    };
    let members: HashSet<DocId> = reference.iter().copied().collect();
    let mut out = Vec::new();
    for &id in other {
        if id > max {
            break;
        }
        if members.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Boolean AND search over an [`IndexStore`].
#[derive(Clone)]
pub struct QueryEngine {
    store: IndexStore,
}

impl QueryEngine {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    /// Ids of documents containing every query term, ascending.
    pub fn matching_ids(&self, query: &str) -> Result<Vec<DocId>> {
        let terms = parse_query(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.store.read_snapshot(|snap| match_terms(snap, &terms))
    }

    /// Documents containing every query term, in ascending id order.
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        let terms = parse_query(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self.store.read_snapshot(|snap| {
            let ids = match_terms(snap, &terms)?;
            let mut docs = Vec::with_capacity(ids.len());
            for id in ids {
                match snap.document(id)? {
                    Some(doc) => docs.push(doc),
                    None => return Err(abort(IndexError::MissingDocument(id))),
                }
            }
            Ok(docs)
        })?;
        tracing::debug!(query, hits = docs.len(), "search complete");
        Ok(docs)
    }
}

fn match_terms(snap: &Snapshot<'_>, terms: &[&str]) -> TxResult<Vec<DocId>> {
    let mut lists = Vec::with_capacity(terms.len());
    for term in terms {
        let ids = snap.postings(term)?.into_vec();
        if ids.is_empty() {
            tracing::debug!(term, "term not in index");
            return Ok(Vec::new());
        }
        lists.push(ids);
    }
    if lists.len() == 1 {
        return Ok(lists.pop().unwrap_or_default());
    }
    lists.sort_by_key(Vec::len);
    let mut rest = lists.into_iter();
    let (Some(first), Some(second)) = (rest.next(), rest.next()) else {
        return Ok(Vec::new());
    };
    let mut result = intersect(&first, &second);
    for list in rest {
        if result.is_empty() {
            break;
        }
        result = intersect(&result, &list);
    }
    Ok(result)
}
