//! Text-completion collaborators
//!
//! The pipeline only ever sees [`CompletionService`]; the concrete adapter is
//! chosen by the binary. Retrying is the caller's job, adapters make one attempt.

use async_trait::async_trait;

use crate::StageResult;

pub mod openai;
pub mod structured;

pub use openai::OpenAiCompletion;

/// One prompt in, one completion out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt`. Failures must be classified so the retry policy can
    /// tell a flaky service from a rejected request.
    async fn complete(&self, prompt: &str) -> StageResult<String>;
}
