use std::path::PathBuf;

use thiserror::Error;

/// Why one upstream item could not become a Candidate Record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedItem {
    #[error("item has no url")]
    MissingUrl,

    #[error("item has no title")]
    MissingTitle,

    #[error("item url {url:?} is not usable: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Startup-time failures. Any of these aborts the run before acquisition.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0} environment variable is required")]
    MissingSecret(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
