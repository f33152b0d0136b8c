//! Source adapters and the per-topic collection step.
//!
//! Every adapter answers the same question ("which releases does this topic
//! show right now?") through a different acquisition mechanism:
//!
//! | kind | module | mechanism |
//! |------|--------|-----------|
//! | `page` | [`page`] | Browserless-rendered discover page + CSS selectors |
//! | `api` | [`api`] | JSON discovery API |
//! | `feed` | [`feed`] | RSS/Atom via feed-rs |
//!
//! Adapters only fetch and extract. [`collect`] turns their output into
//! Candidate Records, absorbing failed topics and malformed items.

pub mod api;
pub mod feed;
pub mod page;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use release_digest_common::{AppConfig, CandidateRecord, SourceConfig, SourceKind};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::traits::SourceAdapter;

pub use api::ApiSource;
pub use feed::FeedSource;
pub use page::PageSource;

/// Output of one topic's collection.
#[derive(Debug, Clone)]
pub struct Collected {
    pub topic: String,
    pub records: Vec<CandidateRecord>,
    /// Raw items the adapter returned, before normalization.
    pub fetched: usize,
    pub malformed: usize,
    pub failed: bool,
}

/// Fetch one topic and normalize its items. Never fails: a fetch error
/// yields zero records, a malformed item is skipped. Both are logged.
pub async fn collect(
    source: &dyn SourceAdapter,
    topic: &str,
    retrieved_at: DateTime<Utc>,
) -> Collected {
    let raw = match source.fetch(topic).await {
        Ok(items) => items,
        Err(e) => {
            warn!(
                topic,
                source = source.name(),
                error = %e,
                "Topic fetch failed, continuing without it"
            );
            return Collected {
                topic: topic.to_string(),
                records: Vec::new(),
                fetched: 0,
                malformed: 0,
                failed: true,
            };
        }
    };

    let base = source.base_url(topic);
    let fetched = raw.len();
    let mut records = Vec::with_capacity(fetched);
    let mut malformed = 0;

    for item in raw {
        let title = item.title.clone();
        let url = item.url.clone();
        match CandidateRecord::from_raw(item, topic, base.as_ref(), retrieved_at) {
            Ok(record) => records.push(record),
            Err(reason) => {
                malformed += 1;
                warn!(topic, ?title, ?url, %reason, "Skipping item with missing data");
            }
        }
    }

    info!(topic, source = source.name(), fetched, kept = records.len(), "Collected topic");

    Collected {
        topic: topic.to_string(),
        records,
        fetched,
        malformed,
        failed: false,
    }
}

/// Build the adapter selected by `config.kind`.
pub fn build_source(
    config: &SourceConfig,
    app: &AppConfig,
) -> Result<Arc<dyn SourceAdapter>, SourceError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let source: Arc<dyn SourceAdapter> = match config.kind {
        SourceKind::Page => Arc::new(PageSource::new(
            &app.browserless_url,
            app.browserless_token.as_deref(),
            config,
            timeout,
        )?),
        SourceKind::Api => Arc::new(ApiSource::new(
            &config.api_endpoint,
            &config.user_agent,
            timeout,
        )?),
        SourceKind::Feed => {
            let template = config.feed_url_template.as_deref().ok_or_else(|| {
                SourceError::UnexpectedShape("feed source needs a feed_url_template".to_string())
            })?;
            Arc::new(FeedSource::new(template, &config.user_agent, timeout)?)
        }
    };

    info!(source = source.name(), timeout_secs = config.timeout_secs, "Source adapter ready");
    Ok(source)
}

/// Substitute the (form-encoded) topic into a `{topic}` URL template.
pub(crate) fn render_template(template: &str, topic: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(topic.as_bytes()).collect();
    template.replace("{topic}", &encoded)
}
