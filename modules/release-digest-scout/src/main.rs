use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use release_digest_common::{AppConfig, FileConfig, SourceKind};
use release_digest_scout::digest::OpenAiDigester;
use release_digest_scout::error::PipelineError;
use release_digest_scout::pipeline::{Pipeline, PipelineConfig};
use release_digest_scout::sink::FileSink;
use release_digest_scout::sources::build_source;
use release_digest_scout::traits::Sink;

#[derive(Parser)]
#[command(name = "release-digest", about = "Collect new releases per genre tag and write a digest")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "release-digest.toml")]
    config: PathBuf,

    /// Override the configured source kind (page, api, feed)
    #[arg(long)]
    source: Option<SourceKind>,

    /// Override the configured topic list (repeatable)
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Stop after writing the candidate set
    #[arg(long)]
    skip_digest: bool,
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("release_digest=info"))?;

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    info!("Release digest starting...");

    // Load TOML config
    let config_path = cli.config.canonicalize().with_context(|| {
        format!(
            "Config file not found: {}. Create one or specify --config <path>",
            cli.config.display()
        )
    })?;
    let config_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    info!(config = %config_path.display(), "Loading config");

    let mut file_config = FileConfig::read(&config_path)?;
    if let Some(kind) = cli.source {
        file_config.source.kind = kind;
    }
    if !cli.topics.is_empty() {
        file_config.topics = cli.topics;
    }
    file_config.validate()?;

    let app_config = AppConfig::from_env()?;
    let instructions = file_config
        .digest
        .resolve_instructions(&config_dir)
        .context("Failed to load digest instructions")?;

    let source = build_source(&file_config.source, &app_config)
        .context("Failed to set up source adapter")?;

    let mut ai = ai_client::OpenAi::new(&app_config.openai_api_key, &file_config.digest.model);
    if let Some(ref base_url) = app_config.openai_base_url {
        ai = ai.with_base_url(base_url);
    }
    let digester = Arc::new(OpenAiDigester::new(ai, &file_config.digest));

    let pipeline = Pipeline::new(
        source,
        digester,
        PipelineConfig::from_file(&file_config, instructions),
    );
    let sink = FileSink::from_config(&file_config.output);
    let now = chrono::Utc::now();

    info!(
        run_id = %pipeline.run_id(),
        source = %file_config.source.kind,
        topics = file_config.topics.len(),
        "Run starting"
    );

    if cli.skip_digest {
        let gathered = pipeline.gather(now).await;
        sink.write_candidates(&gathered.candidates)
            .await
            .context("Failed to write candidate set")?;
        info!("{}", gathered.stats);
        return Ok(());
    }

    match pipeline.execute(now, &sink).await {
        Ok(outcome) => {
            if outcome.digest.is_fallback() {
                warn!("No eligible releases, wrote fallback digest");
            }
            info!("{}", outcome.stats);
            Ok(())
        }
        Err(PipelineError::PersistDigest { source, outcome }) => {
            // Leave the text on stdout so the run's result is not lost.
            println!("{}", outcome.digest.text());
            Err(source).context("Failed to write digest")
        }
        Err(e) => Err(e.into()),
    }
}
