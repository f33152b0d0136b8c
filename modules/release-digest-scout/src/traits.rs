// Trait boundaries of the aggregation pipeline.
//
// SourceAdapter: one acquisition strategy (page scrape, API query, feed read).
// DigestRequester: opaque summarization service: records + instructions → text.
// Sink: durable storage for the raw candidate set and the final text.
//
// Mocks for all three live in `testing` so the pipeline runs without
// network or disk.

use async_trait::async_trait;
use release_digest_common::{CandidateRecord, RawItem};
use url::Url;

use crate::error::{SinkError, SourceError, SummarizeError};

// ---------------------------------------------------------------------------
// SourceAdapter
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short strategy name for logs ("page", "api", "feed").
    fn name(&self) -> &str;

    /// Fetch the raw items for one topic key. One attempt, bounded by the
    /// adapter's own timeout. Per-item problems are not errors here; they
    /// surface when the items are normalized.
    async fn fetch(&self, topic: &str) -> Result<Vec<RawItem>, SourceError>;

    /// Base for resolving relative item links of `topic`, if the source
    /// emits any.
    fn base_url(&self, _topic: &str) -> Option<Url> {
        None
    }
}

// ---------------------------------------------------------------------------
// DigestRequester
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DigestRequester: Send + Sync {
    /// Turn the ranked, bounded records into formatted text. Never called
    /// with an empty slice.
    async fn summarize(
        &self,
        records: &[CandidateRecord],
        instructions: &str,
    ) -> Result<String, SummarizeError>;
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist the deduplicated, pre-filter candidate set.
    async fn write_candidates(&self, candidates: &[CandidateRecord]) -> Result<(), SinkError>;

    /// Persist the digest or the fallback text.
    async fn write_digest(&self, text: &str) -> Result<(), SinkError>;
}
