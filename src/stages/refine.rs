use crate::chunking::{split, Chunk};
use crate::{RepurposeError, StageResult};

use super::{cleanup, prompts, Stages};

impl Stages {
    /// Clean and refine the raw transcript.
    ///
    /// Transcripts longer than one refine window are refined window by window and
    /// stitched back together in source order.
    pub async fn refine(&self, text: &str) -> StageResult<String> {
        if text.trim().is_empty() {
            return Err(RepurposeError::EmptyInput(
                "transcript contains no text".to_string(),
            ));
        }

        let cleaned = cleanup::clean_transcript(text);
        if cleaned.is_empty() {
            return Err(RepurposeError::EmptyInput(
                "transcript is empty after removing timestamps and fillers".to_string(),
            ));
        }

        let window = &self.chunking.refine;
        let windows: Vec<Chunk> = if cleaned.chars().count() > window.size {
            split(&cleaned, window.size, window.overlap)?.collect()
        } else {
            vec![Chunk::new(cleaned.as_str(), 0)]
        };

        let total = windows.len();
        tracing::info!("Refining transcript in {} window(s)", total);

        let mut refined = Vec::with_capacity(total);
        for (i, chunk) in windows.iter().enumerate() {
            let label = format!("refine window {}/{}", i + 1, total);
            let prompt = prompts::refine(&chunk.text, i + 1, total);
            let text = self.complete(&label, &prompt).await?;
            refined.push(text.trim().to_string());
        }

        Ok(refined.join("\n\n"))
    }
}
