use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

// --- Secrets and env-specific values ---

const DEFAULT_BROWSERLESS_URL: &str = "http://localhost:3000";

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; topics, filters and
/// prompts live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub browserless_url: String,
    pub browserless_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY")
                .ok_or(ConfigError::MissingSecret("OPENAI_API_KEY"))?,
            openai_base_url: get("OPENAI_BASE_URL"),
            browserless_url: get("BROWSERLESS_URL")
                .unwrap_or_else(|| DEFAULT_BROWSERLESS_URL.to_string()),
            browserless_token: get("BROWSERLESS_TOKEN"),
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(5).map_or(val.len(), |(i, _)| i);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!(
            "  OPENAI_BASE_URL: {}",
            self.openai_base_url.as_deref().unwrap_or("<not set>")
        );
        tracing::info!("  BROWSERLESS_URL: {}", self.browserless_url);
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview_opt(&self.browserless_token));
    }
}

// --- TOML file config ---

pub const DEFAULT_TOPICS: &[&str] = &[
    "black-metal",
    "atmospheric-black-metal",
    "post-black-metal",
    "blackgaze",
    "depressive-black-metal",
];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

pub const DEFAULT_FALLBACK_TEXT: &str = "# Digest\n\nNo releases found";

pub const DEFAULT_INSTRUCTIONS: &str = "You are the music editor of a black metal digest. \
Pick exactly the 5 best releases from the list you are sent. \
Do not just describe them: convey the atmosphere. \
Compare releases with well-known bands where there is a resemblance, and mention mood, \
production quality, themes and vocals. \
Write briefly and vividly, as if talking to someone who knows the scene. \
Return markdown: each release title is a level-2 heading followed by a short description.";

/// TOML-backed configuration loaded from disk. Every field has a default,
/// so an empty file is a valid (page-scrape, no recency filter) setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    /// Ordered topic keys. Earlier topics win identity conflicts under
    /// first-seen-wins.
    pub topics: Vec<String>,
    pub source: SourceConfig,
    pub filter: FilterConfig,
    pub pipeline: PipelineSettings,
    pub digest: DigestConfig,
    pub output: OutputConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            source: SourceConfig::default(),
            filter: FilterConfig::default(),
            pipeline: PipelineSettings::default(),
            digest: DigestConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Rendered discover page, parsed with CSS selectors.
    #[default]
    Page,
    /// JSON discovery API.
    Api,
    /// RSS/Atom feed per topic.
    Feed,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "page" => Ok(SourceKind::Page),
            "api" => Ok(SourceKind::Api),
            "feed" => Ok(SourceKind::Feed),
            other => Err(ConfigError::Invalid(format!(
                "unknown source kind {other:?} (expected page, api or feed)"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Page => write!(f, "page"),
            SourceKind::Api => write!(f, "api"),
            SourceKind::Feed => write!(f, "feed"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Per-topic fetch timeout. A timeout is a failed topic, not a failed run.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Discover page URL; `{topic}` is replaced with the topic key.
    pub page_url_template: String,
    /// Element that marks one release on the discover page.
    pub page_item_selector: String,
    pub api_endpoint: String,
    /// Feed URL; `{topic}` is replaced with the topic key. Required for `feed`.
    pub feed_url_template: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_url_template: "https://bandcamp.com/discover/{topic}".to_string(),
            page_item_selector: ".discover-result".to_string(),
            api_endpoint: "https://bandcamp.com/api/hub/2/dig_deeper".to_string(),
            feed_url_template: None,
        }
    }
}

/// Eligibility thresholds. Omitted options are disabled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterConfig {
    /// Exclude records older than this many days, and records with no date.
    pub max_age_days: Option<u32>,
    pub min_item_count: Option<u32>,
    /// Exclude records whose item count was never observed.
    pub require_item_count: bool,
    pub min_description_length: Option<usize>,
    /// Exclude records whose description was never observed.
    pub require_description: bool,
    pub max_output: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_age_days: None,
            min_item_count: None,
            require_item_count: false,
            min_description_length: None,
            require_description: false,
            max_output: 20,
        }
    }
}

/// How the identity index resolves two records with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the record from the earliest topic; later duplicates are dropped.
    #[default]
    FirstSeenWins,
    /// Later duplicates overwrite in place.
    LastWriteWins,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineSettings {
    pub merge_policy: MergePolicy,
    /// Topics fetched at once. Merging still happens in topic order.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DigestConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    /// Inline instruction payload. Takes precedence over `instructions_file`.
    pub instructions: Option<String>,
    /// Instruction payload file, relative to the config file's directory.
    pub instructions_file: Option<PathBuf>,
    /// Written instead of a digest when nothing is eligible.
    pub fallback_text: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.9,
            max_tokens: 1200,
            presence_penalty: 0.2,
            instructions: None,
            instructions_file: None,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
        }
    }
}

impl DigestConfig {
    /// Resolve the instruction payload: inline text, then file, then default.
    pub fn resolve_instructions(&self, config_dir: &Path) -> Result<String, ConfigError> {
        if let Some(ref text) = self.instructions {
            return Ok(text.clone());
        }
        match self.instructions_file {
            Some(ref file) => {
                let path = config_dir.join(file);
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })
            }
            None => Ok(DEFAULT_INSTRUCTIONS.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    /// Pre-filter candidate set as JSON.
    pub candidates_path: PathBuf,
    /// Final digest (or fallback) as markdown.
    pub digest_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            candidates_path: PathBuf::from("output/releases.json"),
            digest_path: PathBuf::from("output/digest.md"),
        }
    }
}

impl FileConfig {
    /// Load and parse a TOML config file. Not validated: command-line
    /// overrides go on first, then [`validate`](Self::validate).
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject bounds and templates that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.filter.max_output == 0 {
            return invalid("filter.max_output must be at least 1".to_string());
        }
        if self.filter.max_age_days == Some(0) {
            return invalid(
                "filter.max_age_days must be at least 1 (omit it to disable)".to_string(),
            );
        }
        if self.pipeline.concurrency == 0 {
            return invalid("pipeline.concurrency must be at least 1".to_string());
        }
        if self.source.timeout_secs == 0 {
            return invalid("source.timeout_secs must be at least 1".to_string());
        }
        if let Some(topic) = self.topics.iter().find(|t| t.trim().is_empty()) {
            return invalid(format!("topic keys must not be blank (got {topic:?})"));
        }

        match self.source.kind {
            SourceKind::Page => require_topic_placeholder(
                "source.page_url_template",
                &self.source.page_url_template,
            )?,
            SourceKind::Api => {
                if self.source.api_endpoint.trim().is_empty() {
                    return invalid("source.api_endpoint must be set".to_string());
                }
            }
            SourceKind::Feed => match self.source.feed_url_template {
                Some(ref template) => {
                    require_topic_placeholder("source.feed_url_template", template)?
                }
                None => {
                    return invalid(
                        "source.feed_url_template is required for the feed source".to_string(),
                    )
                }
            },
        }

        Ok(())
    }
}

fn require_topic_placeholder(field: &str, template: &str) -> Result<(), ConfigError> {
    if template.contains("{topic}") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must contain {{topic}}")))
    }
}
