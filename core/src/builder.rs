use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::index::{next_id, BuildResult};
use crate::persist::{FlushStats, IndexStore};
use crate::DocId;

/// The source numbering has no entry at this id; it never counts as the frontier.
pub const RESERVED_ID: DocId = 404;

/// What the fetch client returned for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Payload(Vec<u8>),
    NotFound,
}

/// Fetch-by-sequence-number client. Network and protocol failures are
/// reported as [`IndexError::Transport`].
pub trait Fetch {
    fn fetch(&self, id: DocId) -> Result<Fetched>;

    /// Base URL used to generate each document's back-reference link.
    fn base_url(&self) -> &str;
}

/// Best-effort record of every processed document, in processing order.
pub trait AuditSink {
    fn record(&mut self, id: DocId, doc: &Document) -> anyhow::Result<()>;
}

/// Audit sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudit;

impl AuditSink for NoAudit {
    fn record(&mut self, _id: DocId, _doc: &Document) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Why a run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The fetch client had nothing at this id.
    Frontier(DocId),
    /// The per-run document cap was reached.
    Limit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub start_id: DocId,
    pub processed: usize,
    pub stop: StopReason,
    pub flush: FlushStats,
}

pub struct IndexBuilder<'a, F> {
    fetcher: &'a F,
    audit: &'a mut dyn AuditSink,
    reserved: Option<DocId>,
    max_docs: Option<usize>,
}

impl<'a, F: Fetch> IndexBuilder<'a, F> {
    pub fn new(fetcher: &'a F, audit: &'a mut dyn AuditSink) -> Self {
        Self { fetcher, audit, reserved: Some(RESERVED_ID), max_docs: None }
    }

    pub fn reserved_id(mut self, id: Option<DocId>) -> Self {
        self.reserved = id;
        self
    }

    pub fn max_docs(mut self, max: Option<usize>) -> Self {
        self.max_docs = max;
        self
    }

    /// Fetch, decode and accumulate documents from `start_id` upward until the
    /// frontier. Nothing is persisted here.
    ///
    /// A transport or decode failure discards everything accumulated and
    /// returns [`IndexError::Aborted`] with the count processed so far.
    pub fn build(&mut self, start_id: DocId) -> Result<(BuildResult, StopReason)> {
        let mut run = BuildResult::new(start_id);
        let mut id = start_id.max(1);
        loop {
            if self.max_docs.is_some_and(|max| run.processed() >= max) {
                tracing::info!(id, "document limit reached");
                return Ok((run, StopReason::Limit));
            }
            if self.reserved == Some(id) {
                tracing::debug!(id, "skipping reserved id");
                id = next_id(id).map_err(|e| aborted(&run, e))?;
                continue;
            }
            let payload = match self.fetcher.fetch(id) {
                Ok(Fetched::Payload(bytes)) => bytes,
                Ok(Fetched::NotFound) => {
                    tracing::info!(id, processed = run.processed(), "reached frontier");
                    return Ok((run, StopReason::Frontier(id)));
                }
                Err(e) => return Err(aborted(&run, e)),
            };
            let doc = Document::from_payload(id, &payload, self.fetcher.base_url()).map_err(|e| aborted(&run, e))?;
            if let Err(e) = self.audit.record(id, &doc) {
                tracing::warn!(id, error = %e, "audit log write failed");
            }
            tracing::debug!(id, title = %doc.title, "document processed");
            run.add_document(doc);
            id = next_id(id).map_err(|e| aborted(&run, e))?;
        }
    }
}

fn aborted(run: &BuildResult, source: IndexError) -> IndexError {
    IndexError::Aborted { processed: run.processed(), source: Box::new(source) }
}

/// One incremental update: read the cursor, build from it and flush the run atomically.
pub fn run_update<F: Fetch>(store: &IndexStore, builder: &mut IndexBuilder<'_, F>) -> Result<UpdateSummary> {
    let start_id = store.cursor()?.unwrap_or(1);
    tracing::info!(start_id, "starting update");
    let (run, stop) = builder.build(start_id)?;
    let flush = store.flush(&run)?;
    Ok(UpdateSummary { start_id, processed: run.processed(), stop, flush })
}


#[cfg(test)]
mod tests {
    use super::testing::{MapFetcher, VecAudit};
    use super::*;

    #[test]
    fn empty_store_stops_at_frontier() {
        let store = IndexStore::temporary().unwrap();
        let fetcher = MapFetcher::with_titles(&[(1, "Barrel"), (2, "Petit Trees")]);
        let mut audit = NoAudit;
        let summary = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap();

        assert_eq!(summary.start_id, 1);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.stop, StopReason::Frontier(3));
        assert_eq!(store.cursor().unwrap(), Some(3));
        assert_eq!(store.document(1).unwrap().unwrap().title, "Barrel");
        assert_eq!(store.document(2).unwrap().unwrap().link, "https://xkcd.com/2");
        assert!(store.document(3).unwrap().is_none());
    }

    #[test]
    fn resumes_from_cursor() {
        let store = IndexStore::temporary().unwrap();
        store.set_cursor(3).unwrap();
        let fetcher = MapFetcher::with_titles(&[(1, "old"), (2, "old"), (3, "Island"), (4, "Landscape")]);
        let mut audit = NoAudit;
        let summary = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap();

        assert_eq!(summary.start_id, 3);
        assert_eq!(*fetcher.requested.borrow(), vec![3, 4, 5]);
        assert_eq!(store.cursor().unwrap(), Some(5));
        assert!(store.document(1).unwrap().is_none());
    }

    #[test]
    fn reserved_id_is_skipped_not_frontier() {
        let store = IndexStore::temporary().unwrap();
        store.set_cursor(403).unwrap();
        let mut fetcher = MapFetcher::default();
        fetcher.add(403, "Convincing Pickup Line");
        fetcher.add(405, "Disappearing Sunday Update");
        let mut audit = VecAudit::default();
        let summary = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap();

        assert_eq!(summary.processed, 2);
        assert!(!fetcher.requested.borrow().contains(&RESERVED_ID));
        assert_eq!(audit.0, vec![403, 405]);
        assert!(store.document(RESERVED_ID).unwrap().is_none());
        for entry in store.scan_postings() {
            let (_, ids) = entry.unwrap();
            assert!(!ids.contains(RESERVED_ID));
        }
        assert_eq!(store.cursor().unwrap(), Some(406));
    }

    #[test]
    fn transport_error_discards_run() {
        let store = IndexStore::temporary().unwrap();
        let mut fetcher = MapFetcher::with_titles(&[(1, "a"), (2, "b"), (3, "c")]);
        fetcher.failing = Some(3);
        let mut audit = NoAudit;
        let err = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap_err();

        assert_eq!(err.processed(), Some(2));
        assert!(store.cursor().unwrap().is_none());
        assert!(store.document(1).unwrap().is_none());
        assert_eq!(store.stats().unwrap().terms, 0);
    }

    #[test]
    fn decode_error_aborts_like_transport_error() {
        let store = IndexStore::temporary().unwrap();
        let mut fetcher = MapFetcher::with_titles(&[(1, "a")]);
        fetcher.payloads.insert(2, b"{not json".to_vec());
        let mut audit = NoAudit;
        let err = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap_err();

        match err {
            IndexError::Aborted { processed, source } => {
                assert_eq!(processed, 1);
                assert!(matches!(*source, IndexError::Decode { id: 2, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.cursor().unwrap().is_none());
    }

    #[test]
    fn reprocessing_same_ids_is_idempotent() {
        let store = IndexStore::temporary().unwrap();
        let fetcher = MapFetcher::with_titles(&[(1, "Barrel"), (2, "Barrel Again")]);
        let mut audit = NoAudit;
        run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap();
        let first_doc = store.document(2).unwrap();

        store.set_cursor(1).unwrap();
        let summary = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap();

        assert_eq!(summary.flush.new_postings, 0);
        assert_eq!(store.postings("barrel").unwrap().as_slice(), &[1, 2]);
        assert_eq!(store.document(2).unwrap(), first_doc);
        assert_eq!(store.cursor().unwrap(), Some(3));
    }

    #[test]
    fn document_limit_ends_run_successfully() {
        let store = IndexStore::temporary().unwrap();
        let fetcher = MapFetcher::with_titles(&[(1, "a"), (2, "b"), (3, "c")]);
        let mut audit = NoAudit;
        let summary = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit).max_docs(Some(2))).unwrap();

        assert_eq!(summary.stop, StopReason::Limit);
        assert_eq!(store.cursor().unwrap(), Some(3));
    }

    #[test]
    fn exhausted_id_space_aborts_without_advancing() {
        let store = IndexStore::temporary().unwrap();
        store.set_cursor(DocId::MAX).unwrap();
        let fetcher = MapFetcher::with_titles(&[(DocId::MAX, "last")]);
        let mut audit = NoAudit;
        let err = run_update(&store, &mut IndexBuilder::new(&fetcher, &mut audit)).unwrap_err();

        match err {
            IndexError::Aborted { processed, source } => {
                assert_eq!(processed, 1);
                assert!(matches!(*source, IndexError::Corrupt(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.cursor().unwrap(), Some(DocId::MAX));
        assert!(store.document(DocId::MAX).unwrap().is_none());
    }
}
