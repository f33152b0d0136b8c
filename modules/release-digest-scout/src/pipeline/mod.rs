//! Run driver: collect every topic, merge by identity, filter, rank, bound,
//! then hand the survivors to the digest requester.
//!
//! The stages are exposed separately (`gather`, `select`, `digest`) so the
//! binary can persist the candidate set before summarization begins.

pub mod filter;
pub mod index;
pub mod rank;
pub mod stats;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use release_digest_common::{
    CandidateRecord, FileConfig, FilterConfig, MergePolicy, DEFAULT_FALLBACK_TEXT,
    DEFAULT_INSTRUCTIONS, DEFAULT_TOPICS,
};
use tracing::{debug, info};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::error::{PipelineError, SummarizeError};
use crate::sources::{collect, Collected};
use crate::traits::{DigestRequester, Sink, SourceAdapter};

pub use filter::Rejection;
pub use index::{IdentityIndex, MergeOutcome};
pub use stats::RunStats;

/// Counters are u32; a count that does not fit pins at the maximum.
fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Where a run currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Collecting,
    Merging,
    Filtering,
    Ranking,
    EmptyFallback,
    Summarizing,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Collecting => "collecting",
            RunPhase::Merging => "merging",
            RunPhase::Filtering => "filtering",
            RunPhase::Ranking => "ranking",
            RunPhase::EmptyFallback => "empty_fallback",
            RunPhase::Summarizing => "summarizing",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineConfig {
    #[builder(default = DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect::<Vec<_>>())]
    pub topics: Vec<String>,
    #[builder(default)]
    pub filter: FilterConfig,
    #[builder(default)]
    pub merge_policy: MergePolicy,
    #[builder(default = 1)]
    pub concurrency: usize,
    #[builder(default = DEFAULT_INSTRUCTIONS.to_string(), setter(into))]
    pub instructions: String,
    #[builder(default = DEFAULT_FALLBACK_TEXT.to_string(), setter(into))]
    pub fallback_text: String,
}

impl PipelineConfig {
    /// Pipeline settings from a loaded config file and the already-resolved
    /// instruction payload.
    pub fn from_file(file: &FileConfig, instructions: String) -> Self {
        Self {
            topics: file.topics.iter().map(|t| t.trim().to_string()).collect(),
            filter: file.filter.clone(),
            merge_policy: file.pipeline.merge_policy,
            concurrency: file.pipeline.concurrency,
            instructions,
            fallback_text: file.digest.fallback_text.clone(),
        }
    }
}

/// The deduplicated, pre-filter candidate set of a run.
#[derive(Debug, Clone)]
pub struct Gathered {
    pub candidates: Vec<CandidateRecord>,
    pub stats: RunStats,
}

/// Ranked, bounded records plus the stats extended with filter outcomes.
#[derive(Debug, Clone)]
pub struct Selection {
    pub records: Vec<CandidateRecord>,
    pub stats: RunStats,
}

/// Text to persist as the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestText {
    Summary(String),
    /// Nothing was eligible; the summarizer was not called.
    Fallback(String),
}

impl DigestText {
    pub fn text(&self) -> &str {
        match self {
            DigestText::Summary(text) | DigestText::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DigestText::Fallback(_))
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Deduplicated, pre-filter set.
    pub candidates: Vec<CandidateRecord>,
    /// What the digest was built from.
    pub selected: Vec<CandidateRecord>,
    pub digest: DigestText,
    pub stats: RunStats,
}

pub struct Pipeline {
    source: Arc<dyn SourceAdapter>,
    digester: Arc<dyn DigestRequester>,
    config: PipelineConfig,
    run_id: Uuid,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn SourceAdapter>,
        digester: Arc<dyn DigestRequester>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            digester,
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn enter(&self, phase: RunPhase) {
        info!(run_id = %self.run_id, %phase, "Run phase");
    }

    /// Collect every topic and merge the results into one candidate set.
    ///
    /// Topics may be fetched concurrently, but their outputs are merged in
    /// configured topic order, so the result does not depend on which fetch
    /// finished first.
    pub async fn gather(&self, now: DateTime<Utc>) -> Gathered {
        self.enter(RunPhase::Collecting);
        let source = self.source.as_ref();
        let collected: Vec<Collected> = stream::iter(self.config.topics.iter())
            .map(|topic| collect(source, topic, now))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        self.enter(RunPhase::Merging);
        let mut stats = RunStats::default();
        let mut index = IdentityIndex::new(self.config.merge_policy);

        for topic in collected {
            stats.topics_attempted += 1;
            if topic.failed {
                stats.topics_failed += 1;
            }
            stats.items_fetched = stats
                .items_fetched
                .saturating_add(saturating_count(topic.fetched));
            stats.items_malformed = stats
                .items_malformed
                .saturating_add(saturating_count(topic.malformed));

            for record in topic.records {
                let key = record.identity_key.clone();
                match index.merge(record) {
                    MergeOutcome::Inserted => {}
                    MergeOutcome::Discarded => {
                        stats.duplicates_discarded += 1;
                        debug!(url = %key, topic = %topic.topic, "Duplicate discarded");
                    }
                    MergeOutcome::Replaced => {
                        stats.duplicates_replaced += 1;
                        debug!(
                            url = %key,
                            topic = %topic.topic,
                            "Duplicate replaced earlier record"
                        );
                    }
                }
            }
        }

        stats.candidates = saturating_count(index.len());
        info!(
            run_id = %self.run_id,
            candidates = stats.candidates,
            topics_failed = stats.topics_failed,
            "Candidate set merged"
        );

        Gathered {
            candidates: index.into_records(),
            stats,
        }
    }

    /// Apply the eligibility filter, then rank newest first and bound.
    /// Eligibility is judged against the UTC calendar date of `now`.
    pub fn select(&self, gathered: &Gathered, now: DateTime<Utc>) -> Selection {
        self.enter(RunPhase::Filtering);
        let today = now.date_naive();
        let mut stats = gathered.stats.clone();

        let eligible: Vec<CandidateRecord> = gathered
            .candidates
            .iter()
            .filter(|record| match filter::check(record, &self.config.filter, today) {
                Ok(()) => true,
                Err(rejection) => {
                    debug!(url = %record.identity_key, %rejection, "Not eligible");
                    stats.record_rejection(rejection);
                    false
                }
            })
            .cloned()
            .collect();
        stats.eligible = saturating_count(eligible.len());

        self.enter(RunPhase::Ranking);
        let records = rank::rank_and_truncate(eligible, self.config.filter.max_output);
        stats.selected = saturating_count(records.len());

        info!(
            run_id = %self.run_id,
            eligible = stats.eligible,
            selected = stats.selected,
            "Selection complete"
        );

        Selection { records, stats }
    }

    /// Summarize the selection, or return the fallback text without calling
    /// the digester when there is nothing to summarize.
    pub async fn digest(&self, selected: &[CandidateRecord]) -> Result<DigestText, SummarizeError> {
        if selected.is_empty() {
            self.enter(RunPhase::EmptyFallback);
            return Ok(DigestText::Fallback(self.config.fallback_text.clone()));
        }

        self.enter(RunPhase::Summarizing);
        let text = self
            .digester
            .summarize(selected, &self.config.instructions)
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(DigestText::Summary(text.to_string()))
    }

    /// Full run without persistence.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunOutcome, PipelineError> {
        let gathered = self.gather(now).await;
        self.finish(gathered, now).await
    }

    /// Full run, persisting the candidate set before summarization and the
    /// digest text after it.
    pub async fn execute(
        &self,
        now: DateTime<Utc>,
        sink: &dyn Sink,
    ) -> Result<RunOutcome, PipelineError> {
        let gathered = self.gather(now).await;

        if let Err(source) = sink.write_candidates(&gathered.candidates).await {
            return Err(PipelineError::PersistCandidates {
                source,
                gathered: Box::new(gathered),
            });
        }

        let outcome = self.finish(gathered, now).await?;

        if let Err(source) = sink.write_digest(outcome.digest.text()).await {
            return Err(PipelineError::PersistDigest {
                source,
                outcome: Box::new(outcome),
            });
        }

        Ok(outcome)
    }

    async fn finish(
        &self,
        gathered: Gathered,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, PipelineError> {
        let Selection { records, mut stats } = self.select(&gathered, now);
        let digest = self.digest(&records).await?;
        stats.fallback_used = digest.is_fallback();
        self.enter(RunPhase::Done);

        Ok(RunOutcome {
            candidates: gathered.candidates,
            selected: records,
            digest,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_item, MockDigester, MockSource};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pipeline(source: MockSource, digester: MockDigester, config: PipelineConfig) -> Pipeline {
        Pipeline::new(Arc::new(source), Arc::new(digester), config)
    }

    #[test]
    fn oversized_counts_saturate() {
        assert_eq!(saturating_count(7), 7);
        assert_eq!(saturating_count(usize::MAX), u32::MAX);
    }

    #[test]
    fn phase_names() {
        assert_eq!(RunPhase::EmptyFallback.to_string(), "empty_fallback");
        assert_eq!(RunPhase::Collecting.to_string(), "collecting");
    }

    #[test]
    fn config_defaults() {
        let config = PipelineConfig::builder().build();
        assert_eq!(config.topics.len(), DEFAULT_TOPICS.len());
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.merge_policy, MergePolicy::FirstSeenWins);
        assert_eq!(config.fallback_text, DEFAULT_FALLBACK_TEXT);
    }

    #[test]
    fn config_from_file_trims_topics() {
        let mut file = FileConfig::default();
        file.topics = vec![" doom ".to_string()];
        file.pipeline.concurrency = 3;
        let config = PipelineConfig::from_file(&file, "be brief".to_string());
        assert_eq!(config.topics, vec!["doom".to_string()]);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.instructions, "be brief");
    }

    #[tokio::test]
    async fn gather_counts_failures_and_duplicates() {
        let source = MockSource::new()
            .on_topic("a", vec![record_item("u1", Some("2024-01-02"))])
            .on_topic(
                "b",
                vec![
                    record_item("u1", Some("2024-01-03")),
                    record_item("u2", None),
                ],
            )
            .fail_topic("c");
        let config = PipelineConfig::builder()
            .topics(vec!["a".into(), "b".into(), "c".into()])
            .build();
        let p = pipeline(source, MockDigester::new(), config);

        let gathered = p.gather(now()).await;
        assert_eq!(gathered.candidates.len(), 2);
        assert_eq!(gathered.candidates[0].topic_key, "a");
        assert_eq!(gathered.stats.topics_attempted, 3);
        assert_eq!(gathered.stats.topics_failed, 1);
        assert_eq!(gathered.stats.items_fetched, 3);
        assert_eq!(gathered.stats.duplicates_discarded, 1);
        assert_eq!(gathered.stats.candidates, 2);
    }

    #[tokio::test]
    async fn blank_summary_is_an_error() {
        let source = MockSource::new().on_topic("a", vec![record_item("u1", Some("2024-01-09"))]);
        let config = PipelineConfig::builder().topics(vec!["a".into()]).build();
        let p = pipeline(source, MockDigester::returning("  \n "), config);

        let result = p.run(now()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Summarize(SummarizeError::Empty))
        ));
    }

    #[tokio::test]
    async fn summary_is_trimmed() {
        let source = MockSource::new().on_topic("a", vec![record_item("u1", Some("2024-01-09"))]);
        let config = PipelineConfig::builder().topics(vec!["a".into()]).build();
        let p = pipeline(source, MockDigester::returning("\n## u1\n\n"), config);

        let outcome = p.run(now()).await.unwrap();
        assert_eq!(outcome.digest, DigestText::Summary("## u1".to_string()));
        assert!(!outcome.stats.fallback_used);
    }
}
