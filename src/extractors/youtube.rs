use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{vtt, youtube_video_id, SourceMetadata, Transcript, TranscriptExtractor};
use crate::Result;

/// YouTube transcript extractor using yt-dlp subtitles
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    subtitle_langs: String,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            subtitle_langs: "en.*,en".to_string(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", "--skip-download", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    /// Download manual or automatic subtitles as WebVTT into `dir`
    async fn download_subtitles(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        tracing::debug!("Downloading subtitles for: {}", url);

        let template = dir.join("%(id)s.%(ext)s").to_string_lossy().into_owned();
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--skip-download",
                "--write-subs",
                "--write-auto-subs",
                "--sub-format",
                "vtt",
                "--sub-langs",
                self.subtitle_langs.as_str(),
                "--no-playlist",
                "--output",
                template.as_str(),
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download subtitles: {}", error.trim());
        }

        find_subtitle_file(dir)?
            .ok_or_else(|| anyhow::anyhow!("No transcript is available for this video: {}", url))
    }
}

/// Pick the subtitle file yt-dlp wrote, preferring manual English tracks
fn find_subtitle_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("vtt"))
        .collect();

    // "<id>.en.vtt" sorts before "<id>.en-orig.vtt" and other variants
    candidates.sort_by_key(|path| path.to_string_lossy().len());
    Ok(candidates.into_iter().next())
}

/// Metadata from yt-dlp's JSON dump
fn parse_metadata(info: &Value) -> SourceMetadata {
    let title = info["title"]
        .as_str()
        .unwrap_or("Unknown Title")
        .to_string();
    let channel = info["channel"]
        .as_str()
        .or_else(|| info["uploader"].as_str())
        .map(str::to_string);
    let published_date = info["upload_date"]
        .as_str()
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y%m%d").ok())
        .map(|date| date.format("%Y-%m-%d").to_string());

    SourceMetadata {
        title,
        channel,
        published_date,
    }
}

#[async_trait]
impl TranscriptExtractor for YoutubeExtractor {
    async fn extract(&self, url: &str) -> Result<Transcript> {
        let video_id = youtube_video_id(url)
            .ok_or_else(|| anyhow::anyhow!("Could not find a YouTube video id in: {}", url))?;

        if !self.check_availability().await {
            anyhow::bail!(
                "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
            );
        }

        let info = self.get_video_info(url).await?;
        let source_metadata = parse_metadata(&info);
        tracing::info!("Found video {}: {}", video_id, source_metadata.title);

        let temp_dir = tempfile::tempdir()?;
        let subtitle_path = self.download_subtitles(url, temp_dir.path()).await?;
        let document = tokio::fs::read_to_string(&subtitle_path).await?;
        let text = vtt::flatten(&document);

        tracing::info!("Extracted transcript with {} characters", text.chars().count());

        Ok(Transcript {
            text,
            source_metadata,
            source: url.to_string(),
        })
    }

    fn supports(&self, url: &str) -> bool {
        youtube_video_id(url).is_some()
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}
