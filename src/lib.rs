//! Repurposer - A Rust CLI tool for turning video transcripts into platform posts
//!
//! This library runs one transcript through a staged text pipeline (refine, derive topics,
//! draft, edit) against a text-completion service and aggregates the results into a
//! report with one long-form article, professional micro-posts and short social posts.

pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod stages;
pub mod utils;

pub use chunking::{Chunk, Chunks};
pub use cli::{Cli, Commands, OutputFormat};
pub use completion::CompletionService;
pub use config::Config;
pub use extractors::{SourceMetadata, Transcript, TranscriptExtractor};
pub use output::{OutputSink, Report};
pub use pipeline::{Pipeline, RunResult, RunStage, RunState};
pub use retry::RetryPolicy;
pub use stages::{Artifact, ArtifactOrigin, Draft, Platform, Topic};

/// Result type used by the outer surfaces of the crate
pub type Result<T> = anyhow::Result<T>;

/// Error taxonomy of the repurposing core
#[derive(thiserror::Error, Debug)]
pub enum RepurposeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    TransientService(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<RepurposeError>,
    },

    #[error("Could not parse structured output: {0}")]
    Parse(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl RepurposeError {
    /// Only service-side failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepurposeError::TransientService(_))
    }
}

/// Result type used by pipeline stages and collaborators
pub type StageResult<T> = std::result::Result<T, RepurposeError>;
