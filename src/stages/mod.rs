use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::completion::CompletionService;
use crate::config::{ChunkingConfig, Config, LengthConfig, PlatformsConfig};
use crate::retry::RetryPolicy;
use crate::{RepurposeError, StageResult};

pub mod cleanup;
pub mod draft;
pub mod edit;
pub mod length;
pub mod prompts;
pub mod refine;
pub mod topics;

/// Output targets, each with its own length unit and limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Blog article
    LongForm,
    /// LinkedIn post
    MicroProfessional,
    /// Tweet
    MicroSocial,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::LongForm,
        Platform::MicroProfessional,
        Platform::MicroSocial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LongForm => "long_form",
            Platform::MicroProfessional => "micro_professional",
            Platform::MicroSocial => "micro_social",
        }
    }

    /// Human-readable name used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::LongForm => "Blog Post",
            Platform::MicroProfessional => "LinkedIn Post",
            Platform::MicroSocial => "Twitter Post",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit a platform's length limit is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Words,
    Chars,
}

impl LengthUnit {
    pub fn label(&self) -> &'static str {
        match self {
            LengthUnit::Words => "Word count",
            LengthUnit::Chars => "Character count",
        }
    }
}

/// A content brief derived from the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    pub key_points: Vec<String>,
    pub platform: Platform,
}

/// Points back at the topic a draft or artifact was written for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    /// Position of the topic in the run's topic list
    pub index: usize,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub topic_ref: TopicRef,
    pub content: String,
    pub length_metric: usize,
    pub platform: Platform,
}

/// Whether an artifact went through the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOrigin {
    Edited,
    DraftFallback,
}

/// Final, length-enforced output for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub topic_ref: TopicRef,
    pub content: String,
    pub length_metric: usize,
    pub platform: Platform,
    pub origin: ArtifactOrigin,
}

impl Artifact {
    /// Keep a draft as-is when editing could not improve it
    pub fn from_draft(draft: Draft) -> Self {
        Self {
            topic_ref: draft.topic_ref,
            content: draft.content,
            length_metric: draft.length_metric,
            platform: draft.platform,
            origin: ArtifactOrigin::DraftFallback,
        }
    }
}

/// Stage runner: the refine, topic, draft and edit stages over one completion service
pub struct Stages {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    chunking: ChunkingConfig,
    platforms: PlatformsConfig,
    length: LengthConfig,
}

impl Stages {
    pub fn new(completion: Arc<dyn CompletionService>, config: &Config) -> Self {
        Self {
            completion,
            retry: config.retry,
            chunking: config.chunking.clone(),
            platforms: config.platforms.clone(),
            length: config.length.clone(),
        }
    }

    pub fn platforms(&self) -> &PlatformsConfig {
        &self.platforms
    }

    /// Draft and then edit one topic
    pub async fn run_unit(&self, index: usize, topic: &Topic, refined: &str) -> StageResult<Artifact> {
        let draft = self.draft(index, topic, refined).await?;
        Ok(self.edit(draft).await)
    }

    /// Send one prompt through the retry policy. Blank responses count as a
    /// service failure so they get retried like any other hiccup.
    async fn complete(&self, label: &str, prompt: &str) -> StageResult<String> {
        self.retry
            .call(label, move || async move {
                let text = self.completion.complete(prompt).await?;
                if text.trim().is_empty() {
                    return Err(RepurposeError::TransientService(
                        "completion service returned an empty response".to_string(),
                    ));
                }
                Ok(text)
            })
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted completion service shared by the stage and pipeline tests

    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::completion::CompletionService;
    use crate::{RepurposeError, StageResult};

    /// Replies are matched on the first rule whose needle appears in the prompt.
    /// A rule with a queue pops one reply per call and repeats the last one.
    pub struct ScriptedCompletion {
        rules: Mutex<Vec<(String, VecDeque<StageResult<String>>)>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub fn new() -> Self {
            Self {
                rules: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn on(self, needle: &str, replies: Vec<StageResult<String>>) -> Self {
            self.rules
                .lock()
                .unwrap()
                .push((needle.to_string(), replies.into_iter().collect()));
            self
        }

        pub fn calls_matching(&self, needle: &str) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains(needle))
                .count()
        }
    }

    fn clone_reply(reply: &StageResult<String>) -> StageResult<String> {
        match reply {
            Ok(text) => Ok(text.clone()),
            Err(RepurposeError::Validation(m)) => Err(RepurposeError::Validation(m.clone())),
            Err(RepurposeError::Parse(m)) => Err(RepurposeError::Parse(m.clone())),
            Err(RepurposeError::TransientService(m)) => {
                Err(RepurposeError::TransientService(m.clone()))
            }
            Err(other) => Err(RepurposeError::TransientService(other.to_string())),
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, prompt: &str) -> StageResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());

            let mut rules = self.rules.lock().unwrap();
            for (needle, replies) in rules.iter_mut() {
                if prompt.contains(needle.as_str()) {
                    return if replies.len() > 1 {
                        replies.pop_front().unwrap()
                    } else {
                        replies
                            .front()
                            .map(clone_reply)
                            .unwrap_or_else(|| Ok(String::new()))
                    };
                }
            }

            Err(RepurposeError::Validation(format!(
                "no scripted reply for prompt: {}",
                prompt.lines().next().unwrap_or_default()
            )))
        }
    }
}
