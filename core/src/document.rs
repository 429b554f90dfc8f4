use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::tokenizer::{tokenize_fields, Terms};
use crate::DocId;

/// One harvested comic.
///
/// Deserializes directly from the source's JSON payload (`num` is the id);
/// stored records use the bincode encoding from [`encode_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "num", default)]
    pub id: DocId,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub news: String,
    #[serde(default)]
    pub safe_title: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub title: String,
    /// Back-reference to the document's page; the payload's own `link` is usually empty.
    #[serde(default)]
    pub link: String,
}

impl Document {
    /// Decode a fetched payload. `id` is the fetch sequence number and wins over the payload's `num`.
    pub fn from_payload(id: DocId, payload: &[u8], base_url: &str) -> Result<Self> {
        let mut doc: Document =
            serde_json::from_slice(payload).map_err(|source| IndexError::Decode { id, source })?;
        if doc.id != id {
            tracing::warn!(id, payload_num = doc.id, "payload number differs from fetch id");
            doc.id = id;
        }
        doc.link = document_link(base_url, id);
        Ok(doc)
    }

    /// Terms from the indexable attributes: id, year, news, safe title, transcript, alt text and title.
    pub fn terms(&self) -> Terms {
        let id = self.id.to_string();
        tokenize_fields([
            id.as_str(),
            self.year.as_str(),
            self.news.as_str(),
            self.safe_title.as_str(),
            self.transcript.as_str(),
            self.alt.as_str(),
            self.title.as_str(),
        ])
    }
}

pub fn document_link(base_url: &str, id: DocId) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), id)
}

pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    Ok(bincode::serialize(doc)?)
}

pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    Ok(bincode::deserialize(bytes)?)
}
