use crate::chunking::split;
use crate::completion::structured;
use crate::config::PlatformsConfig;
use crate::{RepurposeError, StageResult};

use super::{prompts, Platform, Stages, Topic};

impl Stages {
    /// Derive the topic set from the leading windows of the refined transcript.
    ///
    /// Windows whose reply cannot be parsed are skipped. A window whose call
    /// exhausts its retries fails the stage.
    pub async fn derive_topics(&self, refined: &str) -> StageResult<Vec<Topic>> {
        if refined.trim().is_empty() {
            return Err(RepurposeError::EmptyInput(
                "refined transcript contains no text".to_string(),
            ));
        }

        let window = &self.chunking.topics;
        let windows: Vec<_> = split(refined, window.size, window.overlap)?
            .take(self.chunking.max_topic_windows.max(1))
            .collect();
        let total = windows.len();

        let mut candidates = Vec::new();
        for (i, chunk) in windows.iter().enumerate() {
            let label = format!("topic window {}/{}", i + 1, total);
            let prompt = prompts::topics(&chunk.text, &self.platforms);
            let reply = self.complete(&label, &prompt).await?;

            match structured::parse_topics(&reply) {
                Ok(found) => {
                    tracing::debug!("{} yielded {} topic candidates", label, found.len());
                    candidates.extend(found);
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", label, err);
                }
            }
        }

        let topics = apply_quotas(candidates, &self.platforms);
        if topics.is_empty() {
            return Err(RepurposeError::EmptyInput(format!(
                "no topics could be derived from {} window(s)",
                total
            )));
        }

        tracing::info!("Derived {} topics", topics.len());
        Ok(topics)
    }
}

/// Keep the first `quota` topics per platform in discovery order, dropping blank
/// and repeated titles. Output is grouped in platform order.
pub fn apply_quotas(candidates: Vec<Topic>, platforms: &PlatformsConfig) -> Vec<Topic> {
    let mut selected = Vec::new();

    for platform in Platform::ALL {
        let quota = platforms.spec(platform).quota;
        let mut kept: Vec<Topic> = Vec::new();

        for topic in candidates.iter().filter(|t| t.platform == platform) {
            if kept.len() >= quota {
                break;
            }
            let title = topic.title.trim();
            if title.is_empty() || kept.iter().any(|k| k.title.eq_ignore_ascii_case(title)) {
                continue;
            }
            kept.push(topic.clone());
        }

        selected.extend(kept);
    }

    selected
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::stages::testing::ScriptedCompletion;

    const TOPICS: &str = "Suggest content topics";

    fn topic(title: &str, platform: Platform) -> Topic {
        Topic {
            title: title.to_string(),
            description: String::new(),
            key_points: Vec::new(),
            platform,
        }
    }

    fn stages(completion: Arc<ScriptedCompletion>, max_windows: usize) -> Stages {
        let mut config = Config::for_tests();
        config.chunking.topics.size = 20;
        config.chunking.topics.overlap = 0;
        config.chunking.max_topic_windows = max_windows;
        Stages::new(completion, &config)
    }

    #[test]
    fn test_apply_quotas_preserves_discovery_order() {
        let platforms = Config::default().platforms;
        let mut candidates = Vec::new();
        for i in 0..7 {
            candidates.push(topic(&format!("tweet {}", i), Platform::MicroSocial));
        }
        candidates.push(topic("blog a", Platform::LongForm));
        candidates.push(topic("blog b", Platform::LongForm));
        candidates.push(topic("post a", Platform::MicroProfessional));
        candidates.push(topic("POST A", Platform::MicroProfessional));
        candidates.push(topic("post b", Platform::MicroProfessional));
        candidates.push(topic("post c", Platform::MicroProfessional));

        let titles: Vec<String> = apply_quotas(candidates, &platforms)
            .into_iter()
            .map(|t| t.title)
            .collect();

        assert_eq!(
            titles,
            vec!["blog a", "post a", "post b", "tweet 0", "tweet 1", "tweet 2", "tweet 3", "tweet 4"]
        );
    }

    #[tokio::test]
    async fn test_unparseable_window_is_skipped() {
        let completion = Arc::new(ScriptedCompletion::new().on(
            TOPICS,
            vec![
                Ok("Sorry, I cannot help with that.".to_string()),
                Ok(r#"{"micro_social": [{"title": "Hook", "description": "d"}]}"#.to_string()),
            ],
        ));
        let stages = stages(completion.clone(), 3);

        let topics = stages
            .derive_topics("AI safety is important for everyone involved")
            .await
            .unwrap();

        assert_eq!(completion.calls_matching(TOPICS), 3);
        // Second and third windows both answered with the same topic
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, "Hook");
        assert_eq!(topics[0].platform, Platform::MicroSocial);
    }

    #[tokio::test]
    async fn test_window_count_is_bounded() {
        let completion = Arc::new(ScriptedCompletion::new().on(
            TOPICS,
            vec![Ok(r#"{"long_form": [{"title": "Deep dive"}]}"#.to_string())],
        ));
        let stages = stages(completion.clone(), 2);

        let long_text = "lots of transcript text ".repeat(50);
        stages.derive_topics(&long_text).await.unwrap();

        assert_eq!(completion.calls_matching(TOPICS), 2);
    }

    #[tokio::test]
    async fn test_no_topics_is_a_failure() {
        let completion = Arc::new(
            ScriptedCompletion::new().on(TOPICS, vec![Ok("no json here".to_string())]),
        );
        let stages = stages(completion, 3);

        let result = stages.derive_topics("short transcript").await;
        assert!(matches!(result, Err(RepurposeError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn test_exhausted_window_fails_the_stage() {
        let completion = Arc::new(ScriptedCompletion::new().on(
            TOPICS,
            vec![Err(RepurposeError::TransientService("timeout".to_string()))],
        ));
        let stages = stages(completion, 3);

        let result = stages.derive_topics("short transcript").await;
        assert!(matches!(result, Err(RepurposeError::RetryExhausted { .. })));
    }
}
