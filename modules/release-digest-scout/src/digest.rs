use ai_client::util::{strip_code_fence, truncate_to_char_boundary};
use ai_client::{OpenAi, PromptBuilder};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use release_digest_common::{CandidateRecord, DigestConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SummarizeError;
use crate::traits::DigestRequester;

/// Descriptions longer than this are cut before they reach the prompt.
const MAX_DESCRIPTION_BYTES: usize = 600;

/// One release as the summarizer sees it.
#[derive(Debug, Serialize)]
struct DigestEntry<'a> {
    title: &'a str,
    creator: &'a str,
    url: &'a str,
    topic: &'a str,
    genre: Option<&'a str>,
    published_at: Option<NaiveDate>,
    item_count: Option<u32>,
    description: Option<&'a str>,
    retrieved_at: DateTime<Utc>,
}

impl<'a> From<&'a CandidateRecord> for DigestEntry<'a> {
    fn from(record: &'a CandidateRecord) -> Self {
        Self {
            title: &record.title,
            creator: &record.creator,
            url: &record.identity_key,
            topic: &record.topic_key,
            genre: record.genre.as_deref(),
            published_at: record.published_at,
            item_count: record.richness.item_count,
            description: record
                .richness
                .description
                .as_deref()
                .map(|d| truncate_to_char_boundary(d, MAX_DESCRIPTION_BYTES)),
            retrieved_at: record.retrieved_at,
        }
    }
}

/// Render the user message sent alongside the instruction payload.
pub fn render_payload(records: &[CandidateRecord]) -> Result<String, SummarizeError> {
    let entries: Vec<DigestEntry<'_>> = records.iter().map(DigestEntry::from).collect();
    let json = serde_json::to_string_pretty(&entries)?;
    Ok(format!("Here is the list of releases as JSON:\n\n{json}"))
}

/// Digest requester backed by an OpenAI-compatible chat completion.
pub struct OpenAiDigester {
    ai: OpenAi,
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
}

impl OpenAiDigester {
    pub fn new(ai: OpenAi, config: &DigestConfig) -> Self {
        Self {
            ai,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            presence_penalty: config.presence_penalty,
        }
    }
}

#[async_trait]
impl DigestRequester for OpenAiDigester {
    async fn summarize(
        &self,
        records: &[CandidateRecord],
        instructions: &str,
    ) -> Result<String, SummarizeError> {
        let payload = render_payload(records)?;
        info!(model = self.ai.model(), records = records.len(), "Requesting digest");

        let response = self
            .ai
            .prompt(payload)
            .preamble(instructions)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .presence_penalty(self.presence_penalty)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Digest request failed");
                SummarizeError::Request(format!("{e:#}"))
            })?;

        let text = strip_code_fence(&response).trim();
        if text.is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(text.to_string())
    }
}
