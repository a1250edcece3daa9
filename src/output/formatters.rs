use anyhow::{Context, Result};
use std::fmt::Write;

use super::{Report, ReportSection};
use crate::stages::ArtifactOrigin;

const SEPARATOR: &str = "----------";

/// Format a report as a plain-text document
pub fn format_as_text(report: &Report) -> String {
    let mut out = String::new();
    let unknown = "Unknown";

    out.push_str("# REPURPOSED CONTENT FROM YOUTUBE VIDEO\n\n");
    out.push_str("## Original Video Information\n");
    let _ = writeln!(out, "Title: {}", report.source.title);
    let _ = writeln!(
        out,
        "Channel: {}",
        report.source.channel.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(
        out,
        "Published Date: {}",
        report.source.published_date.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(out, "URL: {}\n", report.source_url);

    for section in report.sections.iter().filter(|s| !s.entries.is_empty()) {
        format_section(&mut out, section);
    }

    if report.artifact_count() == 0 {
        out.push_str("No content was generated.\n");
    }

    out.trim_end().to_string()
}

fn format_section(out: &mut String, section: &ReportSection) {
    let name = section.platform.display_name();
    let _ = writeln!(out, "## {}S\n", name.to_uppercase());

    for (i, entry) in section.entries.iter().enumerate() {
        let _ = writeln!(out, "### {} {}: {}\n", name, i + 1, entry.title);
        let _ = writeln!(out, "{}\n", entry.content);
        let _ = write!(
            out,
            "{}: {} (limit {})",
            section.unit.label(),
            entry.length_metric,
            section.limit
        );
        if entry.origin == ArtifactOrigin::DraftFallback {
            out.push_str(" [unedited draft]");
        }
        out.push_str("\n\n");
        let _ = writeln!(out, "{}\n", SEPARATOR);
    }
}

/// Format a report as pretty-printed JSON
pub fn format_as_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::SourceMetadata;
    use crate::output::ReportEntry;
    use crate::stages::{LengthUnit, Platform};
    use chrono::Utc;

    fn report() -> Report {
        Report {
            source: SourceMetadata {
                title: "The Future of AI".to_string(),
                channel: None,
                published_date: Some("2024-03-15".to_string()),
            },
            source_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            generated_at: Utc::now(),
            sections: vec![
                ReportSection {
                    platform: Platform::LongForm,
                    unit: LengthUnit::Words,
                    limit: 500,
                    entries: Vec::new(),
                },
                ReportSection {
                    platform: Platform::MicroSocial,
                    unit: LengthUnit::Chars,
                    limit: 280,
                    entries: vec![
                        ReportEntry {
                            topic_index: 1,
                            title: "AI Safety".to_string(),
                            content: "AI safety matters. #AI".to_string(),
                            length_metric: 22,
                            origin: ArtifactOrigin::Edited,
                        },
                        ReportEntry {
                            topic_index: 2,
                            title: "Alignment".to_string(),
                            content: "Alignment is hard.".to_string(),
                            length_metric: 18,
                            origin: ArtifactOrigin::DraftFallback,
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_text_layout() {
        let text = format_as_text(&report());

        assert!(text.starts_with("# REPURPOSED CONTENT FROM YOUTUBE VIDEO\n\n## Original Video Information\n"));
        assert!(text.contains("Title: The Future of AI\n"));
        assert!(text.contains("Channel: Unknown\n"));
        assert!(text.contains("Published Date: 2024-03-15\n"));
        assert!(text.contains("## TWITTER POSTS\n\n### Twitter Post 1: AI Safety\n\nAI safety matters. #AI\n\nCharacter count: 22 (limit 280)\n"));
        assert!(text.contains("### Twitter Post 2: Alignment"));
        assert!(text.contains("Character count: 18 (limit 280) [unedited draft]"));
        assert!(!text.contains("## BLOG POSTS"));
        assert!(text.ends_with(SEPARATOR));
    }

    #[test]
    fn test_text_for_empty_report() {
        let mut report = report();
        report.sections.clear();
        assert!(format_as_text(&report).ends_with("No content was generated."));
    }

    #[test]
    fn test_json_uses_snake_case_platforms() {
        let json = format_as_json(&report()).unwrap();
        assert!(json.contains("\"platform\": \"micro_social\""));
        assert!(json.contains("\"origin\": \"draft_fallback\""));
    }
}
