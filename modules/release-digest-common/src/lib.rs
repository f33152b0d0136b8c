pub mod canonical;
pub mod config;
pub mod dates;
pub mod error;
pub mod types;

pub use canonical::canonical_url;
pub use config::{
    AppConfig, DigestConfig, FileConfig, FilterConfig, MergePolicy, OutputConfig,
    PipelineSettings, SourceConfig, SourceKind, DEFAULT_FALLBACK_TEXT, DEFAULT_INSTRUCTIONS,
    DEFAULT_TOPICS,
};
pub use dates::parse_release_date;
pub use error::{ConfigError, MalformedItem};
pub use types::*;
