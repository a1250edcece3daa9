//! Run orchestration.
//!
//! A run moves through `Init -> Extracted -> Refined -> TopicsDerived -> Drafting
//! -> Aggregated`. Extraction, refinement and topic derivation are sequential and
//! any failure there ends the run. Draft/edit units then fan out with bounded
//! concurrency; a failed unit only loses its own artifact.

use futures_util::{stream, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::completion::CompletionService;
use crate::config::Config;
use crate::extractors::{Transcript, TranscriptExtractor};
use crate::output::{self, Report};
use crate::stages::{Artifact, Stages, Topic};

/// Where a run currently is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    Extracted,
    Refined,
    TopicsDerived,
    Drafting,
    Aggregated,
    ExtractionFailed,
    RefinementFailed,
    TopicDerivationFailed,
}

impl RunStage {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunStage::ExtractionFailed | RunStage::RefinementFailed | RunStage::TopicDerivationFailed
        )
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Init => "init",
            RunStage::Extracted => "extracted",
            RunStage::Refined => "refined",
            RunStage::TopicsDerived => "topics derived",
            RunStage::Drafting => "drafting",
            RunStage::Aggregated => "aggregated",
            RunStage::ExtractionFailed => "extraction failed",
            RunStage::RefinementFailed => "refinement failed",
            RunStage::TopicDerivationFailed => "topic derivation failed",
        };
        f.write_str(name)
    }
}

/// State of one run, owned by the orchestrator.
///
/// Fields are only written through the stage transitions below, so artifacts can
/// be appended but never removed or reordered.
#[derive(Debug)]
pub struct RunState {
    stage: RunStage,
    transcript: Option<Transcript>,
    refined_transcript: Option<String>,
    topics: Vec<Topic>,
    artifacts: Vec<Artifact>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            stage: RunStage::Init,
            transcript: None,
            refined_transcript: None,
            topics: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    pub fn refined_transcript(&self) -> Option<&str> {
        self.refined_transcript.as_deref()
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    fn advance(&mut self, next: RunStage) {
        tracing::debug!("Run stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn record_transcript(&mut self, transcript: Transcript) {
        self.transcript = Some(transcript);
        self.advance(RunStage::Extracted);
    }

    fn record_refined(&mut self, refined: String) {
        self.refined_transcript = Some(refined);
        self.advance(RunStage::Refined);
    }

    fn record_topics(&mut self, topics: Vec<Topic>) {
        self.topics = topics;
        self.advance(RunStage::TopicsDerived);
    }

    fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub stage: RunStage,
    pub reason: String,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.reason)
    }
}

/// Outcome of [`Pipeline::run`]
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub artifacts: Vec<Artifact>,
    pub error: Option<RunFailure>,

    /// Present when the run reached aggregation
    pub report: Option<Report>,

    /// Draft/edit units that produced no artifact
    pub skipped_units: usize,
}

impl RunResult {
    fn failed(stage: RunStage, reason: String) -> Self {
        tracing::error!("Run stopped, {}: {}", stage, reason);
        Self {
            success: false,
            artifacts: Vec::new(),
            error: Some(RunFailure { stage, reason }),
            report: None,
            skipped_units: 0,
        }
    }
}

/// Main repurposing pipeline
pub struct Pipeline {
    extractor: Arc<dyn TranscriptExtractor>,
    stages: Stages,
    concurrency: usize,
    run_timeout: Duration,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TranscriptExtractor>,
        completion: Arc<dyn CompletionService>,
        config: &Config,
    ) -> Self {
        Self {
            extractor,
            stages: Stages::new(completion, config),
            concurrency: config.pipeline.concurrency.max(1),
            run_timeout: Duration::from_secs(config.pipeline.run_timeout_secs),
            progress: None,
        }
    }

    /// Report stage progress on a spinner
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    fn report_progress(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        if let Some(progress) = &self.progress {
            progress.set_message(message);
        }
    }

    /// Run every stage for one source and aggregate what was produced
    pub async fn run(&self, source: &str) -> RunResult {
        let deadline = Instant::now() + self.run_timeout;
        let mut state = RunState::new();

        self.report_progress(format!("Extracting transcript from {}", source));
        match within(deadline, "extraction", self.extractor.extract(source)).await {
            Ok(transcript) => state.record_transcript(transcript),
            Err(reason) => return RunResult::failed(RunStage::ExtractionFailed, reason),
        }

        self.report_progress("Refining transcript");
        let raw = state.transcript().map(|t| t.text.clone()).unwrap_or_default();
        match within(deadline, "refinement", self.stages.refine(&raw)).await {
            Ok(refined) => state.record_refined(refined),
            Err(reason) => return RunResult::failed(RunStage::RefinementFailed, reason),
        }

        self.report_progress("Deriving topics");
        let refined = state.refined_transcript().unwrap_or_default().to_string();
        match within(deadline, "topic derivation", self.stages.derive_topics(&refined)).await {
            Ok(topics) => state.record_topics(topics),
            Err(reason) => return RunResult::failed(RunStage::TopicDerivationFailed, reason),
        }

        state.advance(RunStage::Drafting);
        let topics = state.topics().to_vec();
        let total = topics.len();
        self.report_progress(format!("Writing {} posts", total));

        let skipped_units = self.fan_out(&mut state, &topics, &refined, deadline).await;

        // Extraction succeeded, so the transcript is always present here
        let report = state
            .transcript()
            .map(|t| output::aggregate(t, state.artifacts(), self.stages.platforms()));
        state.advance(RunStage::Aggregated);

        self.report_progress(format!(
            "Generated {} of {} posts",
            state.artifacts().len(),
            total
        ));

        RunResult {
            success: true,
            artifacts: state.artifacts().to_vec(),
            error: None,
            report,
            skipped_units,
        }
    }

    /// Draft and edit every topic, appending artifacts as units complete.
    /// Returns the number of units that produced nothing.
    async fn fan_out(
        &self,
        state: &mut RunState,
        topics: &[Topic],
        refined: &str,
        deadline: Instant,
    ) -> usize {
        let mut units = stream::iter(topics.iter().enumerate())
            .map(|(index, topic)| async move {
                let result = self.stages.run_unit(index, topic, refined).await;
                (topic, result)
            })
            .buffer_unordered(self.concurrency);

        let mut completed = 0;
        loop {
            match timeout_at(deadline, units.next()).await {
                Ok(Some((_, Ok(artifact)))) => {
                    completed += 1;
                    tracing::debug!(
                        "Finished {} post '{}'",
                        artifact.platform,
                        artifact.topic_ref.title
                    );
                    state.push_artifact(artifact);
                }
                Ok(Some((topic, Err(err)))) => {
                    completed += 1;
                    tracing::warn!("Skipping {} post '{}': {}", topic.platform, topic.title, err);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Run deadline elapsed, abandoning {} unfinished post(s)",
                        topics.len() - completed
                    );
                    break;
                }
            }
        }

        topics.len() - state.artifacts().len()
    }
}

/// Await a stage under the run deadline, flattening failures to a reason string
async fn within<T, E, F>(deadline: Instant, stage: &str, future: F) -> Result<T, String>
where
    E: fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match timeout_at(deadline, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(_) => Err(format!("run deadline elapsed during {}", stage)),
    }
}
