use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use release_digest_common::{RawDate, RawItem};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::sources::render_template;
use crate::traits::SourceAdapter;

/// Reads one RSS/Atom feed per topic. Feeds never carry a track count, so
/// `item_count` stays unobserved.
pub struct FeedSource {
    client: reqwest::Client,
    url_template: String,
    user_agent: String,
    timeout_secs: u64,
}

impl FeedSource {
    pub fn new(
        url_template: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        info!(url_template, "Using FeedSource");
        Ok(Self {
            client,
            url_template: url_template.to_string(),
            user_agent: user_agent.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl SourceAdapter for FeedSource {
    fn name(&self) -> &str {
        "feed"
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<RawItem>, SourceError> {
        let url = render_template(&self.url_template, topic);
        debug!(topic, url = %url, "Fetching feed");

        let resp = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: format!("feed {url}"),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout_secs))?;
        parse_feed(&bytes)
    }

    fn base_url(&self, topic: &str) -> Option<url::Url> {
        url::Url::parse(&render_template(&self.url_template, topic)).ok()
    }
}

/// Parse an RSS or Atom document into raw items.
pub fn parse_feed(body: &[u8]) -> Result<Vec<RawItem>, SourceError> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| SourceError::UnexpectedShape(format!("feed: {e}")))?;

    Ok(feed.entries.into_iter().map(entry_to_raw).collect())
}

fn entry_to_raw(entry: Entry) -> RawItem {
    let url = entry
        .links
        .first()
        .map(|link| link.href.clone())
        .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));

    let description = entry
        .summary
        .map(|text| text.content)
        .or_else(|| entry.content.and_then(|content| content.body));

    RawItem {
        url,
        title: entry.title.map(|text| text.content),
        creator: entry.authors.into_iter().next().map(|person| person.name),
        genre: entry.categories.into_iter().next().map(|category| category.term),
        published: entry
            .published
            .or(entry.updated)
            .map(|at| RawDate::Date(at.date_naive())),
        item_count: None,
        description,
    }
}
