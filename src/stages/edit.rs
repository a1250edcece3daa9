use super::length::{self, Enforcement};
use super::{prompts, Artifact, ArtifactOrigin, Draft, Stages};

impl Stages {
    /// Polish a draft into its final artifact.
    ///
    /// This never fails: if the editor cannot be reached the draft itself becomes
    /// the artifact, marked as a fallback.
    pub async fn edit(&self, draft: Draft) -> Artifact {
        let spec = self.platforms.spec(draft.platform);
        let prompt = prompts::edit(&draft, spec);
        let label = format!("edit '{}'", draft.topic_ref.title);

        match self.complete(&label, &prompt).await {
            Ok(reply) => {
                let enforced = length::enforce(reply.trim(), spec, &self.length);
                if enforced.action != Enforcement::Unchanged {
                    tracing::warn!(
                        "Edited '{}' exceeded {} {:?}, {:?} to {}",
                        draft.topic_ref.title,
                        spec.limit,
                        spec.unit,
                        enforced.action,
                        enforced.length_metric
                    );
                }

                Artifact {
                    topic_ref: draft.topic_ref,
                    content: enforced.content,
                    length_metric: enforced.length_metric,
                    platform: draft.platform,
                    origin: ArtifactOrigin::Edited,
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Editing '{}' failed, keeping the draft: {}",
                    draft.topic_ref.title,
                    err
                );
                Artifact::from_draft(draft)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::Config;
    use crate::stages::testing::ScriptedCompletion;
    use crate::stages::{ArtifactOrigin, Draft, Platform, Stages, TopicRef};
    use crate::RepurposeError;

    const EDIT: &str = "Edit and improve this";

    fn draft(platform: Platform, content: &str, length_metric: usize) -> Draft {
        Draft {
            topic_ref: TopicRef {
                index: 2,
                title: "Remote work".to_string(),
            },
            content: content.to_string(),
            length_metric,
            platform,
        }
    }

    #[tokio::test]
    async fn test_edit_replaces_content() {
        let completion = Arc::new(
            ScriptedCompletion::new().on(EDIT, vec![Ok("Sharper post text".to_string())]),
        );
        let stages = Stages::new(completion, &Config::for_tests());

        let artifact = stages
            .edit(draft(Platform::MicroProfessional, "rough post text", 3))
            .await;

        assert_eq!(artifact.content, "Sharper post text");
        assert_eq!(artifact.length_metric, 3);
        assert_eq!(artifact.origin, ArtifactOrigin::Edited);
        assert_eq!(artifact.topic_ref.index, 2);
    }

    #[tokio::test]
    async fn test_exhausted_edit_falls_back_to_draft() {
        let completion = Arc::new(ScriptedCompletion::new().on(
            EDIT,
            vec![Err(RepurposeError::TransientService("overloaded".to_string()))],
        ));
        let stages = Stages::new(completion.clone(), &Config::for_tests());
        let original = draft(Platform::MicroSocial, "Original tweet #AI", 18);

        let artifact = stages.edit(original.clone()).await;

        assert_eq!(completion.calls_matching(EDIT), 2);
        assert_eq!(artifact.content, original.content);
        assert_eq!(artifact.length_metric, original.length_metric);
        assert_eq!(artifact.origin, ArtifactOrigin::DraftFallback);
    }

    #[tokio::test]
    async fn test_rejected_edit_falls_back_without_retry() {
        let completion = Arc::new(ScriptedCompletion::new().on(
            EDIT,
            vec![Err(RepurposeError::Validation("prompt too long".to_string()))],
        ));
        let stages = Stages::new(completion.clone(), &Config::for_tests());

        let artifact = stages.edit(draft(Platform::LongForm, "Blog body", 2)).await;

        assert_eq!(completion.calls_matching(EDIT), 1);
        assert_eq!(artifact.origin, ArtifactOrigin::DraftFallback);
    }

    #[tokio::test]
    async fn test_over_length_edit_is_truncated() {
        let completion =
            Arc::new(ScriptedCompletion::new().on(EDIT, vec![Ok("word ".repeat(300))]));
        let stages = Stages::new(completion, &Config::for_tests());

        let artifact = stages.edit(draft(Platform::MicroProfessional, "short", 1)).await;

        assert_eq!(artifact.origin, ArtifactOrigin::Edited);
        assert_eq!(artifact.length_metric, 100);
    }
}
