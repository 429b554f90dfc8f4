use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::DocId;

/// Width in bytes of one encoded document id.
pub const ID_WIDTH: usize = std::mem::size_of::<DocId>();

/// Big-endian so that byte order matches numeric order for storage keys.
pub fn encode_id(id: DocId) -> [u8; ID_WIDTH] {
    id.to_be_bytes()
}

pub fn decode_id(bytes: &[u8]) -> Result<DocId> {
    let raw: [u8; ID_WIDTH] = bytes
        .try_into()
        .map_err(|_| IndexError::Corrupt(format!("document id must be {ID_WIDTH} bytes, got {}", bytes.len())))?;
    Ok(DocId::from_be_bytes(raw))
}

/// Strictly ascending, duplicate-free list of document ids for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    ids: Vec<DocId>,
}

impl PostingsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary ids, sorting and dropping duplicates.
    pub fn from_ids<I: IntoIterator<Item = DocId>>(ids: I) -> Self {
        let mut ids: Vec<DocId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Add `id`, keeping the list sorted. Returns false if it was already present.
    ///
    /// Ids normally arrive in increasing order, so the common case is an append.
    pub fn insert(&mut self, id: DocId) -> bool {
        match self.ids.last() {
            None => {
                self.ids.push(id);
                true
            }
            Some(&last) if id > last => {
                self.ids.push(id);
                true
            }
            Some(&last) if id == last => false,
            Some(_) => match self.ids.binary_search(&id) {
                Ok(_) => false,
                Err(pos) => {
                    self.ids.insert(pos, id);
                    true
                }
            },
        }
    }

    /// Union `other` into this list. Returns how many ids were new.
    pub fn merge(&mut self, other: &PostingsList) -> usize {
        if other.is_empty() {
            return 0;
        }
        if self.last().map_or(true, |last| other.ids[0] > last) {
            self.ids.extend_from_slice(&other.ids);
            return other.len();
        }
        let before = self.ids.len();
        let mut merged = Vec::with_capacity(self.ids.len() + other.ids.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ids.len() && j < other.ids.len() {
            let (a, b) = (self.ids[i], other.ids[j]);
            if a < b {
                merged.push(a);
                i += 1;
            } else if b < a {
                merged.push(b);
                j += 1;
            } else {
                merged.push(a);
                i += 1;
                j += 1;
            }
        }
        merged.extend_from_slice(&self.ids[i..]);
        merged.extend_from_slice(&other.ids[j..]);
        self.ids = merged;
        self.ids.len() - before
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.ids.len() * ID_WIDTH);
        for id in &self.ids {
            out.extend_from_slice(&encode_id(*id));
        }
        out
    }

    /// Inverse of [`PostingsList::encode`]. Rejects truncated or unordered input.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % ID_WIDTH != 0 {
            return Err(IndexError::Corrupt(format!(
                "postings of {} bytes is not a multiple of {ID_WIDTH}",
                bytes.len()
            )));
        }
        let mut ids = Vec::with_capacity(bytes.len() / ID_WIDTH);
        for chunk in bytes.chunks_exact(ID_WIDTH) {
            let id = decode_id(chunk)?;
            if let Some(&prev) = ids.last() {
                if id <= prev {
                    return Err(IndexError::Corrupt(format!("postings out of order: {prev} then {id}")));
                }
            }
            ids.push(id);
        }
        Ok(Self { ids })
    }

    pub fn as_slice(&self) -> &[DocId] {
        &self.ids
    }

    pub fn into_vec(self) -> Vec<DocId> {
        self.ids
    }

    pub fn last(&self) -> Option<DocId> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocId> {
        self.ids.iter()
    }
}

impl<'a> IntoIterator for &'a PostingsList {
    type Item = &'a DocId;
    type IntoIter = std::slice::Iter<'a, DocId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
