// Test mocks for the digest pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockSource (SourceAdapter): HashMap-based topic→items, per-topic failure and delay
// - MockDigester (DigestRequester): records every call, fixed or failing output
// - MemorySink (Sink): keeps what was written, optionally failing
//
// Plus helpers for building RawItem and CandidateRecord fixtures.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use release_digest_common::{CandidateRecord, RawDate, RawItem, RichnessSignals};
use url::Url;

use crate::error::{SinkError, SourceError, SummarizeError};
use crate::traits::{DigestRequester, Sink, SourceAdapter};

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// HashMap-based source. Unregistered topics return no items.
/// Builder pattern: `.on_topic()`, `.fail_topic()`, `.delay_topic()`, `.with_base()`.
pub struct MockSource {
    items: HashMap<String, Vec<RawItem>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    base: Option<Url>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            failing: HashSet::new(),
            delays: HashMap::new(),
            base: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_topic(mut self, topic: &str, items: Vec<RawItem>) -> Self {
        self.items.insert(topic.to_string(), items);
        self
    }

    pub fn fail_topic(mut self, topic: &str) -> Self {
        self.failing.insert(topic.to_string());
        self
    }

    /// Hold the fetch for `topic` back, to reorder concurrent completions.
    pub fn delay_topic(mut self, topic: &str, delay: Duration) -> Self {
        self.delays.insert(topic.to_string(), delay);
        self
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(Url::parse(base).expect("valid base url"));
        self
    }

    /// Topics fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<RawItem>, SourceError> {
        self.calls.lock().unwrap().push(topic.to_string());
        if let Some(delay) = self.delays.get(topic) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(topic) {
            return Err(SourceError::Network(format!("MockSource: {topic} unreachable")));
        }
        Ok(self.items.get(topic).cloned().unwrap_or_default())
    }

    fn base_url(&self, _topic: &str) -> Option<Url> {
        self.base.clone()
    }
}

// ---------------------------------------------------------------------------
// MockDigester
// ---------------------------------------------------------------------------

enum DigestBehavior {
    /// One `## title` heading per record.
    Headings,
    Fixed(String),
    Fail,
}

/// Records every summarize call. Default output lists one heading per record.
pub struct MockDigester {
    behavior: DigestBehavior,
    calls: Mutex<Vec<(Vec<CandidateRecord>, String)>>,
}

impl MockDigester {
    pub fn new() -> Self {
        Self::with_behavior(DigestBehavior::Headings)
    }

    pub fn returning(text: &str) -> Self {
        Self::with_behavior(DigestBehavior::Fixed(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_behavior(DigestBehavior::Fail)
    }

    fn with_behavior(behavior: DigestBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Records and instructions of the most recent call.
    pub fn last_call(&self) -> Option<(Vec<CandidateRecord>, String)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Default for MockDigester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestRequester for MockDigester {
    async fn summarize(
        &self,
        records: &[CandidateRecord],
        instructions: &str,
    ) -> Result<String, SummarizeError> {
        self.calls
            .lock()
            .unwrap()
            .push((records.to_vec(), instructions.to_string()));

        match &self.behavior {
            DigestBehavior::Headings => Ok(records
                .iter()
                .map(|r| format!("## {}", r.title))
                .collect::<Vec<_>>()
                .join("\n\n")),
            DigestBehavior::Fixed(text) => Ok(text.clone()),
            DigestBehavior::Fail => {
                Err(SummarizeError::Request("MockDigester: refused".to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Keeps the last written candidate set and digest in memory.
#[derive(Default)]
pub struct MemorySink {
    candidates: Mutex<Option<Vec<CandidateRecord>>>,
    digest: Mutex<Option<String>>,
    fail_candidates: bool,
    fail_digest: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_candidates() -> Self {
        Self {
            fail_candidates: true,
            ..Self::default()
        }
    }

    pub fn failing_digest() -> Self {
        Self {
            fail_digest: true,
            ..Self::default()
        }
    }

    pub fn candidates(&self) -> Option<Vec<CandidateRecord>> {
        self.candidates.lock().unwrap().clone()
    }

    pub fn digest(&self) -> Option<String> {
        self.digest.lock().unwrap().clone()
    }

    fn refused(what: &str) -> SinkError {
        SinkError::Io {
            path: PathBuf::from(format!("memory://{what}")),
            source: std::io::Error::other("MemorySink: write refused"),
        }
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write_candidates(&self, candidates: &[CandidateRecord]) -> Result<(), SinkError> {
        if self.fail_candidates {
            return Err(Self::refused("candidates"));
        }
        *self.candidates.lock().unwrap() = Some(candidates.to_vec());
        Ok(())
    }

    async fn write_digest(&self, text: &str) -> Result<(), SinkError> {
        if self.fail_digest {
            return Err(Self::refused("digest"));
        }
        *self.digest.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM-DD` literal.
pub fn date(ymd: &str) -> NaiveDate {
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d").expect("valid test date")
}

/// Fixed retrieval instant for fixtures.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-10T08:00:00Z")
        .expect("valid test instant")
        .with_timezone(&Utc)
}

/// Canonical identity key used by the fixtures for `key`.
pub fn url_for(key: &str) -> String {
    format!("https://a.bandcamp.com/album/{key}")
}

/// A raw item titled `key` whose link canonicalizes to `url_for(key)`.
pub fn record_item(key: &str, published: Option<&str>) -> RawItem {
    RawItem {
        url: Some(format!("{}?from=discover", url_for(key))),
        title: Some(key.to_string()),
        published: published.map(|d| RawDate::Date(date(d))),
        ..RawItem::default()
    }
}

/// A ready-made candidate record titled `key`.
pub fn record(key: &str, topic: &str, published: Option<&str>) -> CandidateRecord {
    CandidateRecord {
        identity_key: url_for(key),
        title: key.to_string(),
        creator: String::new(),
        topic_key: topic.to_string(),
        genre: None,
        published_at: published.map(date),
        richness: RichnessSignals::default(),
        retrieved_at: fixed_now(),
    }
}
