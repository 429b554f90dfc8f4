use sled::transaction::TransactionError;
use thiserror::Error;

use crate::DocId;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("transport error fetching document {id}: {message}")]
    Transport { id: DocId, message: String },

    #[error("failed to decode document {id}: {source}")]
    Decode {
        id: DocId,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("corrupt index data: {0}")]
    Corrupt(String),

    #[error("document {0} is referenced by the index but not stored")]
    MissingDocument(DocId),

    #[error("run aborted after {processed} documents: {source}")]
    Aborted {
        processed: usize,
        #[source]
        source: Box<IndexError>,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    /// Number of documents processed before the run was aborted, if this is an aborted run.
    pub fn processed(&self) -> Option<usize> {
        match self {
            IndexError::Aborted { processed, .. } => Some(*processed),
            _ => None,
        }
    }
}

impl From<TransactionError<IndexError>> for IndexError {
    fn from(err: TransactionError<IndexError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => IndexError::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_reports_processed_count() {
        let err = IndexError::Aborted {
            processed: 7,
            source: Box::new(IndexError::Transport { id: 8, message: "connection reset".into() }),
        };
        assert_eq!(err.processed(), Some(7));
        assert_eq!(
            err.to_string(),
            "run aborted after 7 documents: transport error fetching document 8: connection reset"
        );
    }

    #[test]
    fn transaction_abort_unwraps_inner_error() {
        let err: IndexError = TransactionError::Abort(IndexError::MissingDocument(3)).into();
        assert!(matches!(err, IndexError::MissingDocument(3)));
        assert_eq!(err.processed(), None);
    }
}
