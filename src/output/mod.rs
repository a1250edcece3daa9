use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::config::PlatformsConfig;
use crate::extractors::{SourceMetadata, Transcript};
use crate::stages::{Artifact, ArtifactOrigin, LengthUnit, Platform};
use crate::utils::generate_unique_filename;

pub mod formatters;

pub use formatters::*;

/// Everything a run produced, grouped by platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub source: SourceMetadata,

    /// URL or path of the source video
    pub source_url: String,

    pub generated_at: DateTime<Utc>,

    /// One section per platform, in platform order
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub platform: Platform,
    pub unit: LengthUnit,
    pub limit: usize,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Position of the topic in the run's topic list
    pub topic_index: usize,
    pub title: String,
    pub content: String,
    pub length_metric: usize,
    pub origin: ArtifactOrigin,
}

impl Report {
    pub fn section(&self, platform: Platform) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.platform == platform)
    }

    pub fn artifact_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }
}

/// Fold the artifacts of a run and its source metadata into one report.
///
/// Entries within a platform are ordered by topic, independent of the order in
/// which the units completed.
pub fn aggregate(transcript: &Transcript, artifacts: &[Artifact], platforms: &PlatformsConfig) -> Report {
    let sections = Platform::ALL
        .into_iter()
        .map(|platform| {
            let spec = platforms.spec(platform);
            let mut matching: Vec<&Artifact> =
                artifacts.iter().filter(|a| a.platform == platform).collect();
            matching.sort_by_key(|a| a.topic_ref.index);

            ReportSection {
                platform,
                unit: spec.unit,
                limit: spec.limit,
                entries: matching
                    .into_iter()
                    .map(|a| ReportEntry {
                        topic_index: a.topic_ref.index,
                        title: a.topic_ref.title.clone(),
                        content: a.content.clone(),
                        length_metric: a.length_metric,
                        origin: a.origin,
                    })
                    .collect(),
            }
        })
        .collect();

    Report {
        source: transcript.source_metadata.clone(),
        source_url: transcript.source.clone(),
        generated_at: Utc::now(),
        sections,
    }
}

/// Render a report in the requested format
pub fn render(report: &Report, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(report)),
        OutputFormat::Json => format_as_json(report),
    }
}

/// Somewhere a finished report can be persisted
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Persist the report and return where it went
    async fn persist(&self, report: &Report) -> Result<String>;
}

/// Writes reports to disk
pub struct FileSink {
    target: FileTarget,
    format: OutputFormat,
}

enum FileTarget {
    Path(PathBuf),
    Directory(PathBuf),
}

impl FileSink {
    /// Write to exactly `path`
    pub fn to_path(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            target: FileTarget::Path(path.into()),
            format,
        }
    }

    /// Write to a uniquely named file inside `dir`
    pub fn in_directory(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            target: FileTarget::Directory(dir.into()),
            format,
        }
    }

    fn path_for(&self, report: &Report) -> PathBuf {
        match &self.target {
            FileTarget::Path(path) => path.clone(),
            FileTarget::Directory(dir) => dir.join(generate_unique_filename(
                &report.source.title,
                self.format.extension(),
            )),
        }
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn persist(&self, report: &Report) -> Result<String> {
        let path = self.path_for(report);
        save_to_file(report, &path, &self.format).await?;
        Ok(path.display().to_string())
    }
}

/// Prints reports to stdout
pub struct ConsoleSink {
    format: OutputFormat,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl OutputSink for ConsoleSink {
    async fn persist(&self, report: &Report) -> Result<String> {
        print_to_console(report, &self.format)?;
        Ok("stdout".to_string())
    }
}

/// Save a report to file
pub async fn save_to_file(report: &Report, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(report, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    fs_err::write(path, content).context("Failed to write report")?;
    Ok(())
}

/// Print a report to console
pub fn print_to_console(report: &Report, format: &OutputFormat) -> Result<()> {
    let content = render(report, format)?;
    println!("{}", content);
    Ok(())
}
