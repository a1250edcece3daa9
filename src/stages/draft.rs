use crate::chunking::{build_context, select_best, split};
use crate::{RepurposeError, StageResult};

use super::length::{self, Enforcement};
use super::{prompts, Draft, Stages, Topic, TopicRef};

impl Stages {
    /// Write the first version of a post for one topic.
    ///
    /// Context comes from the transcript windows most relevant to the topic, sized
    /// for the topic's platform. Over-length replies are cut locally, never regenerated.
    pub async fn draft(&self, index: usize, topic: &Topic, refined: &str) -> StageResult<Draft> {
        if refined.trim().is_empty() {
            return Err(RepurposeError::EmptyInput(
                "refined transcript contains no text".to_string(),
            ));
        }

        let window = self.chunking.draft.window(topic.platform);
        let chunks = split(refined, window.size, window.overlap)?;
        let selected = select_best(chunks, topic, self.chunking.top_k);
        let context = build_context(&selected);

        tracing::debug!(
            "Drafting '{}' ({}) from {} window(s)",
            topic.title,
            topic.platform,
            selected.len()
        );

        let spec = self.platforms.spec(topic.platform);
        let prompt = prompts::draft(topic, spec, &context);
        let label = format!("draft '{}'", topic.title);
        let reply = self.complete(&label, &prompt).await?;

        let enforced = length::enforce(reply.trim(), spec, &self.length);
        if enforced.action != Enforcement::Unchanged {
            tracing::warn!(
                "Draft '{}' exceeded {} {:?}, {:?} to {}",
                topic.title,
                spec.limit,
                spec.unit,
                enforced.action,
                enforced.length_metric
            );
        }

        Ok(Draft {
            topic_ref: TopicRef {
                index,
                title: topic.title.clone(),
            },
            content: enforced.content,
            length_metric: enforced.length_metric,
            platform: topic.platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::Config;
    use crate::stages::testing::ScriptedCompletion;
    use crate::stages::{Platform, Stages, Topic};

    const DRAFT: &str = "Write a tweet";

    fn ai_safety() -> Topic {
        Topic {
            title: "AI Safety".to_string(),
            description: "Why it matters".to_string(),
            key_points: vec!["AI safety".to_string()],
            platform: Platform::MicroSocial,
        }
    }

    fn stages(completion: Arc<ScriptedCompletion>) -> Stages {
        let mut config = Config::for_tests();
        config.chunking.draft.micro_social.size = 24;
        config.chunking.draft.micro_social.overlap = 0;
        config.chunking.top_k = 1;
        Stages::new(completion, &config)
    }

    #[tokio::test]
    async fn test_draft_uses_most_relevant_window() {
        let completion = Arc::new(
            ScriptedCompletion::new().on(DRAFT, vec![Ok("AI safety matters. #AI".to_string())]),
        );
        let stages = stages(completion.clone());

        let transcript = "Let's discuss the agenda. AI safety is important.";
        let draft = stages.draft(4, &ai_safety(), transcript).await.unwrap();

        assert_eq!(draft.content, "AI safety matters. #AI");
        assert_eq!(draft.length_metric, 22);
        assert_eq!(draft.topic_ref.index, 4);
        assert_eq!(draft.platform, Platform::MicroSocial);

        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[0].contains("AI safety is important"));
        assert!(!prompts[0].contains("agenda"));
    }

    #[tokio::test]
    async fn test_over_length_draft_is_truncated_not_regenerated() {
        let long_reply = "AI safety ".repeat(60);
        let completion = Arc::new(ScriptedCompletion::new().on(DRAFT, vec![Ok(long_reply)]));
        let stages = stages(completion.clone());

        let draft = stages
            .draft(0, &ai_safety(), "AI safety is important.")
            .await
            .unwrap();

        assert_eq!(completion.calls_matching(DRAFT), 1);
        assert!(draft.length_metric <= 280);
        assert_eq!(draft.content.chars().count(), draft.length_metric);
        assert!(draft.content.ends_with("..."));
    }

    #[tokio::test]
    async fn test_draft_without_matches_still_gets_context() {
        let completion =
            Arc::new(ScriptedCompletion::new().on(DRAFT, vec![Ok("A post".to_string())]));
        let stages = stages(completion.clone());

        stages
            .draft(0, &ai_safety(), "Nothing about the topic appears in here at all.")
            .await
            .unwrap();

        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[0].contains("Nothing about the topic"));
    }
}
