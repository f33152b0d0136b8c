use std::time::Duration;

use async_trait::async_trait;
use release_digest_common::{RawDate, RawItem};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::traits::SourceAdapter;

/// Queries the platform's JSON discovery endpoint, newest first.
pub struct ApiSource {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    timeout_secs: u64,
}

impl ApiSource {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        info!(endpoint, "Using ApiSource");
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            user_agent: user_agent.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl SourceAdapter for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<RawItem>, SourceError> {
        let body = discovery_query(topic);
        debug!(topic, endpoint = %self.endpoint, "Discovery API request");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", &self.user_agent)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout_secs))?;
        parse_discovery_response(&bytes)
    }
}

fn discovery_query(topic: &str) -> serde_json::Value {
    serde_json::json!({
        "filters": {
            "format": "all",
            "location": 0,
            "sort": "date",
            "tags": [topic],
        },
        "page": 1,
    })
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(default = "default_ok")]
    ok: bool,
    items: Option<Vec<serde_json::Value>>,
    error_message: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// One release as the discovery API reports it. Fields the API omits stay
/// unknown.
#[derive(Debug, Deserialize)]
struct DiscoveryItem {
    title: Option<String>,
    artist: Option<String>,
    tralbum_url: Option<String>,
    genre: Option<String>,
    release_date: Option<String>,
    track_count: Option<u32>,
    about: Option<String>,
}

impl From<DiscoveryItem> for RawItem {
    fn from(item: DiscoveryItem) -> Self {
        RawItem {
            url: item.tralbum_url,
            title: item.title,
            creator: item.artist,
            genre: item.genre,
            published: item.release_date.map(RawDate::Text),
            item_count: item.track_count,
            description: item.about,
        }
    }
}

/// Parse a discovery response body. Items that do not even deserialize are
/// skipped individually; a body without an item list is an unexpected shape.
pub fn parse_discovery_response(body: &[u8]) -> Result<Vec<RawItem>, SourceError> {
    let response: DiscoveryResponse = serde_json::from_slice(body)
        .map_err(|e| SourceError::UnexpectedShape(format!("discovery response: {e}")))?;

    if !response.ok {
        return Err(SourceError::UnexpectedShape(format!(
            "discovery API returned ok=false: {}",
            response.error_message.unwrap_or_default()
        )));
    }

    let values = response
        .items
        .ok_or_else(|| {
            SourceError::UnexpectedShape("discovery response has no items".to_string())
        })?;

    let items = values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value::<DiscoveryItem>(value) {
            Ok(item) => Some(RawItem::from(item)),
            Err(e) => {
                warn!(position, error = %e, "Skipping undecodable discovery item");
                None
            }
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_topic_tag() {
        let body = discovery_query("blackgaze");
        assert_eq!(body["filters"]["tags"][0], "blackgaze");
        assert_eq!(body["filters"]["sort"], "date");
    }

    #[test]
    fn parses_items_with_partial_fields() {
        let body = br#"{
            "ok": true,
            "items": [
                {"title": "Ash", "artist": "Wolves", "tralbum_url": "https://w.bandcamp.com/album/ash",
                 "genre": "metal", "release_date": "02 Jan 2024 00:00:00 GMT", "track_count": 6,
                 "about": "cold and raw"},
                {"title": "Bare", "tralbum_url": "https://b.bandcamp.com/album/bare"}
            ]
        }"#;
        let items = parse_discovery_response(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_count, Some(6));
        assert_eq!(items[0].description.as_deref(), Some("cold and raw"));
        assert_eq!(items[1].creator, None);
        assert_eq!(items[1].item_count, None);
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn undecodable_item_skipped() {
        let body = br#"{"items": [{"title": 42}, {"title": "Ok", "tralbum_url": "https://o.bandcamp.com/album/ok"}]}"#;
        let items = parse_discovery_response(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Ok"));
    }

    #[test]
    fn missing_items_is_unexpected_shape() {
        let result = parse_discovery_response(br#"{"ok": true}"#);
        assert!(matches!(result, Err(SourceError::UnexpectedShape(_))));
    }

    #[test]
    fn not_ok_is_unexpected_shape() {
        let result = parse_discovery_response(br#"{"ok": false, "error_message": "bad tag"}"#);
        assert!(matches!(
            result,
            Err(SourceError::UnexpectedShape(msg)) if msg.contains("bad tag")
        ));
    }

    #[test]
    fn html_body_is_unexpected_shape() {
        let result = parse_discovery_response(b"<html>rate limited</html>");
        assert!(matches!(result, Err(SourceError::UnexpectedShape(_))));
    }
}
