pub mod error;

pub use error::{BrowserlessError, Result};

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Body of a Browserless `/content` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<&'a str>,
    goto_options: GotoOptions,
    wait_for_selector: WaitForSelector<'a>,
}

#[derive(Debug, Serialize)]
struct GotoOptions {
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user_agent: Option<String>,
    timeout: Duration,
}

impl BrowserlessClient {
    /// Build a client whose page loads, selector waits and HTTP round trip
    /// all share one `timeout` budget.
    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        // Leave headroom so Browserless reports its own timeout before ours fires.
        let client = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            user_agent: None,
            timeout,
        })
    }

    /// Override the browser user agent for rendered pages.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint, once `selector` is present in the DOM.
    pub async fn content_when_ready(&self, url: &str, selector: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let body = ContentRequest {
            url,
            user_agent: self.user_agent.as_deref(),
            goto_options: GotoOptions {
                timeout: timeout_ms,
            },
            wait_for_selector: WaitForSelector {
                selector,
                timeout: timeout_ms,
            },
        };

        debug!(url, selector, "Browserless content request");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout(self.timeout.as_secs())
                } else {
                    BrowserlessError::from(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_browserless_field_names() {
        let body = ContentRequest {
            url: "https://bandcamp.com/discover/black-metal",
            user_agent: Some("Mozilla/5.0"),
            goto_options: GotoOptions { timeout: 60_000 },
            wait_for_selector: WaitForSelector {
                selector: ".discover-result",
                timeout: 60_000,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userAgent"], "Mozilla/5.0");
        assert_eq!(json["gotoOptions"]["timeout"], 60_000);
        assert_eq!(json["waitForSelector"]["selector"], ".discover-result");
    }

    #[test]
    fn user_agent_omitted_when_unset() {
        let body = ContentRequest {
            url: "https://example.com",
            user_agent: None,
            goto_options: GotoOptions { timeout: 1_000 },
            wait_for_selector: WaitForSelector {
                selector: "li",
                timeout: 1_000,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("userAgent").is_none());
        assert_eq!(json["waitForSelector"]["timeout"], 1_000);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = BrowserlessClient::with_timeout(
            "http://localhost:3000/",
            None,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:3000");
    }
}
