use crate::config::{PlatformSpec, PlatformsConfig};

use super::{Draft, LengthUnit, Platform, Topic};

fn limit_phrase(spec: &PlatformSpec) -> String {
    match spec.unit {
        LengthUnit::Words => format!("{} words", spec.limit),
        LengthUnit::Chars => format!("{} characters", spec.limit),
    }
}

fn style(platform: Platform) -> &'static str {
    match platform {
        Platform::LongForm => {
            "an informative blog post with a compelling headline, a clear introduction, \
             2-3 main points and a concluding call-to-action"
        }
        Platform::MicroProfessional => {
            "a professional LinkedIn post that opens with a strong hook, focuses on one \
             insight, uses short paragraphs and ends with a question and 3-5 hashtags"
        }
        Platform::MicroSocial => {
            "a tweet with an attention-grabbing hook, one clear message and 1-2 hashtags"
        }
    }
}

pub fn refine(text: &str, window: usize, total: usize) -> String {
    format!(
        "Refine this transcript excerpt (part {window} of {total}) for clarity and readability \
         while keeping its original meaning.\n\
         Fix transcription errors and grammar, keep technical terms and the speaker's voice.\n\
         Return only the refined text without explanations or markup.\n\n\
         Transcript:\n{text}"
    )
}

pub fn topics(excerpt: &str, platforms: &PlatformsConfig) -> String {
    let long_form = platforms.spec(Platform::LongForm);
    let professional = platforms.spec(Platform::MicroProfessional);
    let social = platforms.spec(Platform::MicroSocial);

    format!(
        "Suggest content topics based on this transcript excerpt:\n\
         - {} blog topics (posts up to {})\n\
         - {} LinkedIn topics (posts up to {})\n\
         - {} Twitter topics (posts up to {})\n\n\
         Respond with JSON only, shaped as \
         {{\"long_form\": [...], \"micro_professional\": [...], \"micro_social\": [...]}} \
         where every topic is {{\"title\": string, \"description\": string, \"key_points\": [string]}}.\n\n\
         Transcript excerpt:\n{}",
        long_form.quota,
        limit_phrase(long_form),
        professional.quota,
        limit_phrase(professional),
        social.quota,
        limit_phrase(social),
        excerpt
    )
}

pub fn draft(topic: &Topic, spec: &PlatformSpec, context: &str) -> String {
    let key_points = if topic.key_points.is_empty() {
        "- (none given)".to_string()
    } else {
        topic
            .key_points
            .iter()
            .map(|point| format!("- {}", point))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Write {} of at most {}.\n\n\
         Topic: {}\n\
         Description: {}\n\
         Key points:\n{}\n\n\
         Use this transcript material as the source:\n{}\n\n\
         Return only the post.",
        style(topic.platform),
        limit_phrase(spec),
        topic.title,
        topic.description,
        key_points,
        context
    )
}

pub fn edit(draft: &Draft, spec: &PlatformSpec) -> String {
    format!(
        "Edit and improve this {} for grammar, clarity and impact while keeping its core message.\n\
         It must stay within {}.\n\n\
         Post:\n{}\n\n\
         Return only the edited post.",
        draft.platform.display_name(),
        limit_phrase(spec),
        draft.content
    )
}
