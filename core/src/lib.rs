//! Incremental comic indexer: harvested documents, an inverted index over
//! their text, and boolean AND search, persisted in sled.

pub mod builder;
pub mod document;
pub mod error;
pub mod index;
pub mod persist;
pub mod postings;
pub mod query;
pub mod tokenizer;

pub use builder::{run_update, AuditSink, Fetch, Fetched, IndexBuilder, NoAudit, StopReason, UpdateSummary, RESERVED_ID};
pub use document::Document;
pub use error::{IndexError, Result};
pub use index::{BuildResult, DocId};
pub use persist::{FlushStats, IndexStats, IndexStore};
pub use postings::PostingsList;
pub use query::{intersect, QueryEngine};
