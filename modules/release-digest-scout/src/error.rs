use std::path::PathBuf;

use browserless_client::BrowserlessError;
use thiserror::Error;

use crate::pipeline::{Gathered, RunOutcome};

/// A whole-topic acquisition failure. Recovered by the pipeline as
/// "zero candidates for this topic".
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid item selector {0:?}")]
    InvalidSelector(String),
}

impl From<BrowserlessError> for SourceError {
    fn from(err: BrowserlessError) -> Self {
        match err {
            BrowserlessError::Network(msg) => SourceError::Network(msg),
            BrowserlessError::Timeout(secs) => SourceError::Timeout(secs),
            BrowserlessError::Api { status, message } => SourceError::Api { status, message },
        }
    }
}

impl SourceError {
    /// Classify a reqwest failure, keeping timeouts distinct.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(timeout_secs)
        } else if err.is_decode() {
            SourceError::UnexpectedShape(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Any failure of the digest requester. Fatal to the run, never retried.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Digest request failed: {0}")]
    Request(String),

    #[error("Digest service returned an empty response")]
    Empty,

    #[error("Failed to serialize releases for the digest request: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize candidates: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Run-terminating failures. Persistence errors carry whatever the run had
/// already computed so the caller can retry the write on its own.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error("Persisting the candidate set failed: {source}")]
    PersistCandidates {
        #[source]
        source: SinkError,
        gathered: Box<Gathered>,
    },

    #[error("Persisting the digest failed: {source}")]
    PersistDigest {
        #[source]
        source: SinkError,
        outcome: Box<RunOutcome>,
    },
}
