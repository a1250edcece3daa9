use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub mod local;
pub mod vtt;
pub mod youtube;

use crate::Result;

/// Where a transcript came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,

    /// Channel or uploader name, if known
    pub channel: Option<String>,

    /// Publication date as `YYYY-MM-DD`, if known
    pub published_date: Option<String>,
}

/// Raw transcript of one video, created once by an extractor and never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub source_metadata: SourceMetadata,

    /// URL or path the transcript was extracted from
    pub source: String,
}

/// Trait for extracting transcripts from different sources
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptExtractor: Send + Sync {
    /// Extract the transcript and metadata for `source`
    async fn extract(&self, source: &str) -> Result<Transcript>;

    /// Check if this extractor supports the given source
    fn supports(&self, source: &str) -> bool;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;
}

/// Registry for managing multiple extractors
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TranscriptExtractor>>,
    local: local::LocalTranscriptExtractor,
}

impl ExtractorRegistry {
    /// Create a new registry with default extractors
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
            local: local::LocalTranscriptExtractor::new(),
        };

        registry.register(Box::new(youtube::YoutubeExtractor::new()));

        registry
    }

    /// Register a new extractor
    pub fn register(&mut self, extractor: Box<dyn TranscriptExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find an extractor that supports the given URL
    pub fn find_extractor(&self, url: &str) -> Option<&dyn TranscriptExtractor> {
        self.extractors
            .iter()
            .find(|extractor| extractor.supports(url))
            .map(|boxed| boxed.as_ref())
    }

    /// List all supported sources
    pub fn list_platforms(&self) -> Vec<&'static str> {
        self.extractors
            .iter()
            .map(|extractor| extractor.platform_name())
            .chain(std::iter::once(self.local.platform_name()))
            .collect()
    }

    /// Check if input is a local file path
    pub fn is_local_file(&self, input: &str) -> bool {
        if input.starts_with("http://") || input.starts_with("https://") {
            return false;
        }

        let path = Path::new(input);
        if path.exists() {
            return true;
        }

        let has_extension = path.extension().is_some();
        let has_path_separators = input.contains('/') || input.contains('\\');

        has_extension || has_path_separators
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptExtractor for ExtractorRegistry {
    async fn extract(&self, source: &str) -> Result<Transcript> {
        if self.is_local_file(source) {
            return self.local.extract(source).await;
        }

        validate_url(source)?;
        let extractor = self
            .find_extractor(source)
            .ok_or_else(|| anyhow::anyhow!("No extractor found for URL: {}", source))?;

        tracing::debug!("Using {} extractor for {}", extractor.platform_name(), source);
        extractor.extract(source).await
    }

    fn supports(&self, source: &str) -> bool {
        self.is_local_file(source) || self.find_extractor(source).is_some()
    }

    fn platform_name(&self) -> &'static str {
        "Any"
    }
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

static YOUTUBE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|v/|e/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("video id pattern is valid")
});

/// The 11-character video id of a YouTube URL, if it is one
pub fn youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_video_id_forms() {
        let id = "dQw4w9WgXcQ";
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?si=abc",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(youtube_video_id(url), Some(id), "{}", url);
        }
    }

    #[test]
    fn test_youtube_video_id_rejects_bad_ids() {
        assert_eq!(youtube_video_id("https://youtu.be/short"), None);
        assert_eq!(youtube_video_id("https://www.youtube.com/watch?v=waytoolongvideoid"), None);
        assert_eq!(youtube_video_id("https://vimeo.com/123456789"), None);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_registry_routes_local_paths() {
        let registry = ExtractorRegistry::new();
        assert!(registry.is_local_file("./talk.txt"));
        assert!(registry.is_local_file("transcripts/talk.vtt"));
        assert!(!registry.is_local_file("https://youtu.be/dQw4w9WgXcQ"));
        assert!(registry.supports("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!registry.supports("https://vimeo.com/123456789"));
    }

    #[tokio::test]
    async fn test_registry_rejects_unsupported_url() {
        let registry = ExtractorRegistry::new();
        let err = registry.extract("https://vimeo.com/123456789").await.unwrap_err();
        assert!(err.to_string().contains("No extractor found"));
    }

    #[tokio::test]
    async fn test_registered_extractor_is_used() {
        let mut mock = MockTranscriptExtractor::new();
        mock.expect_supports()
            .returning(|source| source.contains("example.com"));
        mock.expect_platform_name().return_const("Example");
        mock.expect_extract().times(1).returning(|source| {
            Ok(Transcript {
                text: "hello".to_string(),
                source_metadata: SourceMetadata::default(),
                source: source.to_string(),
            })
        });

        let mut registry = ExtractorRegistry::new();
        registry.register(Box::new(mock));

        let transcript = registry.extract("https://example.com/talk").await.unwrap();
        assert_eq!(transcript.text, "hello");
        assert!(registry.list_platforms().contains(&"Example"));
    }
}
