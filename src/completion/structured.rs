//! Parsing of structured (JSON) completion replies.
//!
//! Models tend to wrap JSON in prose or markdown fences, so the object is located
//! first and only then handed to serde.

use serde::Deserialize;

use crate::stages::{Platform, Topic};
use crate::{RepurposeError, StageResult};

/// Locate the JSON object inside a completion reply.
///
/// Prefers a fenced code block; otherwise takes everything between the first
/// `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        let body_start = after_fence.find('\n').map(|idx| idx + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopicReply {
    #[serde(alias = "blog_topics")]
    long_form: Vec<TopicEntry>,
    #[serde(alias = "linkedin_topics")]
    micro_professional: Vec<TopicEntry>,
    #[serde(alias = "twitter_topics")]
    micro_social: Vec<TopicEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopicEntry {
    Detailed {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        key_points: Vec<String>,
    },
    Title(String),
}

impl TopicEntry {
    fn into_topic(self, platform: Platform) -> Topic {
        match self {
            TopicEntry::Detailed {
                title,
                description,
                key_points,
            } => Topic {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                key_points,
                platform,
            },
            TopicEntry::Title(title) => Topic {
                title: title.trim().to_string(),
                description: String::new(),
                key_points: Vec::new(),
                platform,
            },
        }
    }
}

/// Parse a topic-derivation reply into topics, in reply order per platform.
pub fn parse_topics(text: &str) -> StageResult<Vec<Topic>> {
    let json = extract_json(text)
        .ok_or_else(|| RepurposeError::Parse("no JSON object in topic reply".to_string()))?;

    let reply: TopicReply = serde_json::from_str(json)
        .map_err(|err| RepurposeError::Parse(format!("invalid topic JSON: {}", err)))?;

    let topics = reply
        .long_form
        .into_iter()
        .map(|entry| entry.into_topic(Platform::LongForm))
        .chain(
            reply
                .micro_professional
                .into_iter()
                .map(|entry| entry.into_topic(Platform::MicroProfessional)),
        )
        .chain(
            reply
                .micro_social
                .into_iter()
                .map(|entry| entry.into_topic(Platform::MicroSocial)),
        )
        .collect();

    Ok(topics)
}
