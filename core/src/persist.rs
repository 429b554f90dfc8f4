use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::document::{decode_document, encode_document, Document};
use crate::error::{IndexError, Result};
use crate::index::BuildResult;
use crate::postings::{decode_id, encode_id, PostingsList};
use crate::DocId;

const POSTINGS_TREE: &str = "postings";
const DOCUMENTS_TREE: &str = "documents";
const META_TREE: &str = "meta";
const CURSOR_KEY: &[u8] = b"cursor";

pub(crate) type TxResult<T> = ConflictableTransactionResult<T, IndexError>;

/// Abort the surrounding transaction with `err`.
pub(crate) fn abort(err: IndexError) -> ConflictableTransactionError<IndexError> {
    ConflictableTransactionError::Abort(err)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub terms: usize,
    pub documents: usize,
    pub cursor: Option<DocId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub terms: usize,
    pub new_postings: usize,
    pub documents: usize,
    pub cursor: DocId,
}

/// Postings, documents and the resume cursor in one sled database.
///
/// Cloning is cheap and clones share the same database.
#[derive(Clone)]
pub struct IndexStore {
    db: Db,
    postings: Tree,
    documents: Tree,
    meta: Tree,
}

impl IndexStore {
    /// Open or create the database directory at `path`. sled locks the directory,
    /// so a second process opening the same index fails here.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Throwaway in-memory-backed store, removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self> {
        let postings = db.open_tree(POSTINGS_TREE)?;
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, postings, documents, meta })
    }

    pub fn cursor(&self) -> Result<Option<DocId>> {
        self.meta.get(CURSOR_KEY)?.map(|v| decode_id(&v)).transpose()
    }

    pub fn set_cursor(&self, id: DocId) -> Result<()> {
        self.meta.insert(CURSOR_KEY, &encode_id(id)[..])?;
        self.db.flush()?;
        Ok(())
    }

    /// Postings for `term`; unknown terms yield an empty list.
    pub fn postings(&self, term: &str) -> Result<PostingsList> {
        match self.postings.get(term.as_bytes())? {
            Some(bytes) => PostingsList::decode(&bytes),
            None => Ok(PostingsList::new()),
        }
    }

    /// Union `ids` into the stored list for `term`. Returns how many ids were new.
    pub fn merge_postings(&self, term: &str, ids: &PostingsList) -> Result<usize> {
        let added = self.postings.transaction(|tx| merge_in(tx, term, ids))?;
        Ok(added)
    }

    pub fn document(&self, id: DocId) -> Result<Option<Document>> {
        self.documents.get(encode_id(id))?.map(|v| decode_document(&v)).transpose()
    }

    pub fn put_document(&self, doc: &Document) -> Result<()> {
        self.documents.insert(encode_id(doc.id), encode_document(doc)?)?;
        Ok(())
    }

    /// Every term with its postings, in term byte order.
    pub fn scan_postings(&self) -> impl Iterator<Item = Result<(String, PostingsList)>> + '_ {
        self.postings.iter().map(|entry| {
            let (key, value) = entry?;
            let term = String::from_utf8(key.to_vec())
                .map_err(|e| IndexError::Corrupt(format!("term key is not utf-8: {e}")))?;
            Ok((term, PostingsList::decode(&value)?))
        })
    }

    /// Every stored document in ascending id order.
    pub fn scan_documents(&self) -> impl Iterator<Item = Result<(DocId, Document)>> + '_ {
        self.documents.iter().map(|entry| {
            let (key, value) = entry?;
            Ok((decode_id(&key)?, decode_document(&value)?))
        })
    }

    pub fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats { terms: self.postings.len(), documents: self.documents.len(), cursor: self.cursor()? })
    }

    /// Commit a run: merge its postings, upsert its documents and advance the
    /// cursor in one transaction across all three trees, then sync to disk.
    pub fn flush(&self, run: &BuildResult) -> Result<FlushStats> {
        let mut encoded = Vec::with_capacity(run.documents.len());
        for (id, doc) in &run.documents {
            encoded.push((encode_id(*id), encode_document(doc)?));
        }
        let cursor = run.next_cursor()?;

        let new_postings = (&self.postings, &self.documents, &self.meta).transaction(|(postings, documents, meta)| {
            let mut added = 0;
            for (term, ids) in &run.postings {
                added += merge_in(postings, term, ids)?;
            }
            for (key, value) in &encoded {
                documents.insert(&key[..], value.as_slice())?;
            }
            meta.insert(CURSOR_KEY, &encode_id(cursor)[..])?;
            Ok(added)
        })?;
        self.db.flush()?;

        let stats = FlushStats { terms: run.postings.len(), new_postings, documents: encoded.len(), cursor };
        tracing::info!(
            terms = stats.terms,
            new_postings = stats.new_postings,
            documents = stats.documents,
            cursor = stats.cursor,
            "index flushed"
        );
        Ok(stats)
    }

    /// Run `f` against one consistent view of postings and documents.
    /// sled may retry `f` on conflict, so it must not have side effects.
    pub(crate) fn read_snapshot<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&Snapshot<'_>) -> TxResult<T>,
    {
        let out = (&self.postings, &self.documents)
            .transaction(|(postings, documents)| f(&Snapshot { postings, documents }))?;
        Ok(out)
    }
}

/// Read access to postings and documents inside one transaction.
pub(crate) struct Snapshot<'a> {
    postings: &'a TransactionalTree,
    documents: &'a TransactionalTree,
}

impl Snapshot<'_> {
    pub fn postings(&self, term: &str) -> TxResult<PostingsList> {
        match self.postings.get(term.as_bytes())? {
            Some(bytes) => PostingsList::decode(&bytes).map_err(abort),
            None => Ok(PostingsList::new()),
        }
    }

    pub fn document(&self, id: DocId) -> TxResult<Option<Document>> {
        match self.documents.get(encode_id(id))? {
            Some(bytes) => decode_document(&bytes).map(Some).map_err(abort),
            None => Ok(None),
        }
    }
}

fn merge_in(tree: &TransactionalTree, term: &str, ids: &PostingsList) -> TxResult<usize> {
    let mut stored = match tree.get(term.as_bytes())? {
        Some(bytes) => PostingsList::decode(&bytes).map_err(abort)?,
        None => PostingsList::new(),
    };
    let added = stored.merge(ids);
    if added > 0 {
        tree.insert(term.as_bytes(), stored.encode())?;
    }
    Ok(added)
}
