use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;
use url::Url;

use crate::canonical::canonical_url;
use crate::dates::parse_release_date;
use crate::error::MalformedItem;

// --- Raw upstream items ---

/// A published date as an upstream source handed it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDate {
    /// Free text still to be parsed ("02 Jan 2024 00:00:00 GMT").
    Text(String),
    /// Already typed by the source (feeds, JSON APIs).
    Date(NaiveDate),
}

impl From<NaiveDate> for RawDate {
    fn from(date: NaiveDate) -> Self {
        RawDate::Date(date)
    }
}

impl From<&str> for RawDate {
    fn from(text: &str) -> Self {
        RawDate::Text(text.to_string())
    }
}

impl From<String> for RawDate {
    fn from(text: String) -> Self {
        RawDate::Text(text)
    }
}

/// One upstream item as extracted by a source adapter, before validation.
/// Every field is optional; `CandidateRecord::from_raw` decides what is fatal.
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder)]
pub struct RawItem {
    #[builder(default, setter(strip_option, into))]
    pub url: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub title: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub creator: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub genre: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub published: Option<RawDate>,
    #[builder(default, setter(strip_option))]
    pub item_count: Option<u32>,
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
}

// --- Candidate records ---

/// Content-richness signals. `None` means the source did not observe the
/// signal, never "zero" or "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichnessSignals {
    pub item_count: Option<u32>,
    pub description: Option<String>,
}

/// One discovered release, normalized and immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Canonical release URL; unique within a run's final set.
    #[serde(rename = "url")]
    pub identity_key: String,
    pub title: String,
    /// Artist name; empty when the source did not say.
    #[serde(rename = "artist")]
    pub creator: String,
    /// Topic key whose query produced this record.
    #[serde(rename = "tag")]
    pub topic_key: String,
    pub genre: Option<String>,
    pub published_at: Option<NaiveDate>,
    #[serde(flatten)]
    pub richness: RichnessSignals,
    #[serde(rename = "fetched_at")]
    pub retrieved_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Normalize a raw item. Fails only when the url or title is missing
    /// or unusable; an unparseable date becomes unknown.
    pub fn from_raw(
        raw: RawItem,
        topic_key: &str,
        base: Option<&Url>,
        retrieved_at: DateTime<Utc>,
    ) -> Result<Self, MalformedItem> {
        let title = non_blank(raw.title).ok_or(MalformedItem::MissingTitle)?;
        let url = raw.url.ok_or(MalformedItem::MissingUrl)?;
        let identity_key = canonical_url(&url, base)?;

        let published_at = match raw.published {
            Some(RawDate::Date(date)) => Some(date),
            Some(RawDate::Text(text)) => {
                let parsed = parse_release_date(&text);
                if parsed.is_none() {
                    debug!(
                        url = %identity_key,
                        date = %text,
                        "Unparseable release date, treating as unknown"
                    );
                }
                parsed
            }
            None => None,
        };

        Ok(Self {
            identity_key,
            title,
            creator: non_blank(raw.creator).unwrap_or_default(),
            topic_key: topic_key.to_string(),
            genre: non_blank(raw.genre),
            published_at,
            richness: RichnessSignals {
                item_count: raw.item_count,
                description: raw.description.map(|d| d.trim().to_string()),
            },
            retrieved_at,
        })
    }

    /// Whole days between `published_at` and `today`; `None` when unknown.
    pub fn age_days(&self, today: NaiveDate) -> Option<i64> {
        self.published_at.map(|p| (today - p).num_days())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn from_raw_normalizes_fields() {
        let raw = RawItem::builder()
            .url("https://band.bandcamp.com/album/x?from=discover_page")
            .title("  Night   Rites ")
            .creator("by Band")
            .published("02 Jan 2024 00:00:00 GMT")
            .build();

        let record = CandidateRecord::from_raw(raw, "black-metal", None, at()).unwrap();
        assert_eq!(record.identity_key, "https://band.bandcamp.com/album/x");
        assert_eq!(record.title, "Night Rites");
        assert_eq!(record.creator, "by Band");
        assert_eq!(record.topic_key, "black-metal");
        assert_eq!(record.published_at, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(record.richness, RichnessSignals::default());
    }

    #[test]
    fn missing_title_is_malformed() {
        let raw = RawItem::builder().url("https://a.bandcamp.com/album/x").build();
        assert_eq!(
            CandidateRecord::from_raw(raw, "t", None, at()),
            Err(MalformedItem::MissingTitle)
        );

        let blank = RawItem::builder()
            .url("https://a.bandcamp.com/album/x")
            .title("   ")
            .build();
        assert_eq!(
            CandidateRecord::from_raw(blank, "t", None, at()),
            Err(MalformedItem::MissingTitle)
        );
    }

    #[test]
    fn missing_url_is_malformed() {
        let raw = RawItem::builder().title("Untitled").build();
        assert_eq!(
            CandidateRecord::from_raw(raw, "t", None, at()),
            Err(MalformedItem::MissingUrl)
        );
    }

    #[test]
    fn unparseable_date_becomes_unknown() {
        let raw = RawItem::builder()
            .url("https://a.bandcamp.com/album/x")
            .title("X")
            .published("someday")
            .build();
        let record = CandidateRecord::from_raw(raw, "t", None, at()).unwrap();
        assert_eq!(record.published_at, None);
        assert_eq!(record.age_days(at().date_naive()), None);
    }

    #[test]
    fn unobserved_signals_serialize_as_null() {
        let raw = RawItem::builder()
            .url("https://a.bandcamp.com/album/x")
            .title("X")
            .build();
        let record = CandidateRecord::from_raw(raw, "t", None, at()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["item_count"].is_null());
        assert!(json["description"].is_null());
        assert_eq!(json["url"], "https://a.bandcamp.com/album/x");
        assert_eq!(json["artist"], "");
    }

    #[test]
    fn age_in_whole_days() {
        let raw = RawItem::builder()
            .url("https://a.bandcamp.com/album/x")
            .title("X")
            .published(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .build();
        let record = CandidateRecord::from_raw(raw, "t", None, at()).unwrap();
        assert_eq!(record.age_days(at().date_naive()), Some(7));
    }
}
