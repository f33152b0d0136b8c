use std::path::{Path, PathBuf};

use async_trait::async_trait;
use release_digest_common::{CandidateRecord, OutputConfig};
use tracing::info;

use crate::error::SinkError;
use crate::traits::Sink;

/// Writes the candidate set as pretty JSON and the digest as markdown.
pub struct FileSink {
    candidates_path: PathBuf,
    digest_path: PathBuf,
}

impl FileSink {
    pub fn new(candidates_path: impl Into<PathBuf>, digest_path: impl Into<PathBuf>) -> Self {
        Self {
            candidates_path: candidates_path.into(),
            digest_path: digest_path.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.candidates_path, &config.digest_path)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_err)
}

#[async_trait]
impl Sink for FileSink {
    async fn write_candidates(&self, candidates: &[CandidateRecord]) -> Result<(), SinkError> {
        let json = serde_json::to_vec_pretty(candidates)?;
        write_file(&self.candidates_path, &json).await?;
        info!(
            path = %self.candidates_path.display(),
            count = candidates.len(),
            "Candidate set written"
        );
        Ok(())
    }

    async fn write_digest(&self, text: &str) -> Result<(), SinkError> {
        write_file(&self.digest_path, text.as_bytes()).await?;
        info!(path = %self.digest_path.display(), "Digest written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[tokio::test]
    async fn writes_json_and_markdown_into_new_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(
            dir.path().join("out/releases.json"),
            dir.path().join("out/digest.md"),
        );

        let mut r = record("u1", "black-metal", Some("2024-01-02"));
        r.title = "Ænigma".to_string();
        sink.write_candidates(&[r]).await.unwrap();
        sink.write_digest("## Ænigma").await.unwrap();

        let json = std::fs::read_to_string(dir.path().join("out/releases.json")).unwrap();
        assert!(json.contains("Ænigma"));
        let back: Vec<CandidateRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].topic_key, "black-metal");

        let md = std::fs::read_to_string(dir.path().join("out/digest.md")).unwrap();
        assert_eq!(md, "## Ænigma");
    }

    #[tokio::test]
    async fn empty_candidate_set_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releases.json");
        let sink = FileSink::new(&path, dir.path().join("digest.md"));
        sink.write_candidates(&[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn unwritable_path_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").unwrap();

        let sink = FileSink::new(blocker.join("releases.json"), dir.path().join("digest.md"));
        let err = sink.write_candidates(&[]).await.unwrap_err();
        match err {
            SinkError::Io { path, .. } => assert_eq!(path, blocker.join("releases.json")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
