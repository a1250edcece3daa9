use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;

use super::{vtt, SourceMetadata, Transcript, TranscriptExtractor};
use crate::Result;

/// Reads transcripts that are already on disk as plain text or WebVTT
pub struct LocalTranscriptExtractor;

impl LocalTranscriptExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Check if the file exists and is accessible
    async fn validate_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }

        if !path.is_file() {
            anyhow::bail!("Path is not a file: {}", path.display());
        }

        if !self.supports(&path.to_string_lossy()) {
            anyhow::bail!(
                "Unsupported transcript file (expected .txt or .vtt): {}",
                path.display()
            );
        }

        Ok(())
    }

    async fn metadata_for(&self, path: &Path) -> SourceMetadata {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Local File")
            .to_string();

        let published_date = fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(|modified| DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string());

        SourceMetadata {
            title,
            channel: None,
            published_date,
        }
    }
}

impl Default for LocalTranscriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptExtractor for LocalTranscriptExtractor {
    async fn extract(&self, source: &str) -> Result<Transcript> {
        let path = Path::new(source);
        self.validate_file(path).await?;

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read transcript file {}", path.display()))?;

        let is_vtt = path.extension().and_then(|ext| ext.to_str()) == Some("vtt");
        let text = if is_vtt { vtt::flatten(&content) } else { content };

        Ok(Transcript {
            text,
            source_metadata: self.metadata_for(path).await,
            source: source.to_string(),
        })
    }

    fn supports(&self, source: &str) -> bool {
        matches!(
            Path::new(source)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
                .as_deref(),
            Some("txt") | Some("vtt")
        )
    }

    fn platform_name(&self) -> &'static str {
        "Local transcript file (.txt, .vtt)"
    }
}
