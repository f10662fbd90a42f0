//! The session orchestrator.
//!
//! Runs every analysis stage of every requested session: skips stages whose
//! artifact already exists, reserves rate budget before each provider call,
//! chunks oversized inputs, retries with exponential backoff, paces calls
//! and stages, and honors cooperative cancellation between calls.
//!
//! One failed stage never aborts the rest of its session; the failure is
//! recorded on the job and the loop moves on.

use std::sync::Arc;
use std::time::Duration;

use lectern_core::segment::format_transcript;
use lectern_core::stats::SessionStats;
use lectern_llm::{
    chunker, estimate_tokens, BackoffPolicy, Provider, ProviderError, RateLimiter, RetryClass,
};
use lectern_settings::PipelineSettings;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::artifact::ArtifactStore;
use crate::error::StageError;
use crate::job::{AnalysisJob, JobStatus, RunSummary, SessionReport};
use crate::source::TranscriptSource;
use crate::stage::{AnalysisStage, CombinePolicy, ORDERED};

/// Number of top speakers included in the engagement prompt.
const ENGAGEMENT_PROMPT_SPEAKERS: usize = 10;

/// Shape of the `engagement_metrics.json` artifact: computed stats plus the
/// provider's qualitative analysis.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EngagementArtifact<'a> {
    #[serde(flatten)]
    stats: &'a SessionStats,
    qualitative_analysis: &'a str,
}

/// Drives sessions through the analysis stages.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    source: Arc<dyn TranscriptSource>,
    store: Arc<dyn ArtifactStore>,
    limiter: Arc<RateLimiter>,
    backoff: BackoffPolicy,
    pipeline: PipelineSettings,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        provider: Arc<dyn Provider>,
        source: Arc<dyn TranscriptSource>,
        store: Arc<dyn ArtifactStore>,
        limiter: Arc<RateLimiter>,
        backoff: BackoffPolicy,
        pipeline: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            source,
            store,
            limiter,
            backoff,
            pipeline,
        }
    }

    /// Process all requested sessions, at most `max_concurrent_sessions`
    /// at a time. The shared rate limiter keeps the combined token spend
    /// inside the window budget regardless of concurrency.
    pub async fn run(self: Arc<Self>, session_ids: &[String], cancel: CancellationToken) -> RunSummary {
        let semaphore = Arc::new(Semaphore::new(self.pipeline.max_concurrent_sessions.max(1)));
        let mut tasks = JoinSet::new();

        for session_id in session_ids {
            let this = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let session_id = session_id.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                this.run_session(&session_id, &cancel).await
            });
        }

        let mut reports = Vec::with_capacity(session_ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => warn!(error = %e, "session task failed to join"),
            }
        }
        RunSummary::from_reports(reports)
    }

    /// Run every stage of one session.
    ///
    /// Cancellation between provider calls leaves unstarted stages Pending;
    /// a re-run skips whatever already produced an artifact and picks the
    /// pending stages back up.
    #[instrument(skip(self, cancel))]
    pub async fn run_session(&self, session_id: &str, cancel: &CancellationToken) -> SessionReport {
        let mut jobs: Vec<AnalysisJob> = ORDERED
            .iter()
            .map(|stage| AnalysisJob::pending(session_id, *stage))
            .collect();

        let segments = match self.source.list_segments(session_id).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!(error = %e, "could not load transcript");
                let reason = e.to_string();
                for job in &mut jobs {
                    job.status = JobStatus::Failed(reason.clone());
                }
                return SessionReport {
                    session_id: session_id.to_string(),
                    jobs,
                };
            }
        };

        let transcript = format_transcript(&segments);
        let stats = SessionStats::compute(&segments);
        let mut produced_exec: Option<String> = None;
        // Pacing owed by the previous stage, applied before the next one.
        let mut pending_delay: Option<Duration> = None;

        for (idx, stage) in ORDERED.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(delay) = pending_delay.take() {
                if self.pause(delay, cancel).await.is_err() {
                    break;
                }
            }

            match self.store.exists(session_id, stage).await {
                Ok(true) => {
                    info!(stage = stage.name(), "artifact exists, skipping");
                    jobs[idx].status = JobStatus::Skipped;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    jobs[idx].status = JobStatus::Failed(e.to_string());
                    continue;
                }
            }

            let input = match stage {
                AnalysisStage::ConciseSummary => match &produced_exec {
                    Some(text) => text.clone(),
                    None => {
                        match self
                            .store
                            .read(session_id, AnalysisStage::ExecutiveSummary)
                            .await
                        {
                            Ok(text) => text,
                            Err(_) => {
                                let err = StageError::MissingDependency(
                                    "executive summary was not produced".to_string(),
                                );
                                jobs[idx].status = JobStatus::Failed(err.to_string());
                                continue;
                            }
                        }
                    }
                },
                AnalysisStage::EngagementMetrics => stats.summary_lines(ENGAGEMENT_PROMPT_SPEAKERS),
                _ => transcript.clone(),
            };

            jobs[idx].status = JobStatus::Running;
            match self.run_stage(stage, &input, cancel).await {
                Ok((output, chunked)) => {
                    let content = if stage == AnalysisStage::EngagementMetrics {
                        match serde_json::to_string_pretty(&EngagementArtifact {
                            stats: &stats,
                            qualitative_analysis: &output,
                        }) {
                            Ok(json) => json,
                            Err(e) => {
                                jobs[idx].status = JobStatus::Failed(e.to_string());
                                continue;
                            }
                        }
                    } else {
                        output.clone()
                    };

                    match self.store.write(session_id, stage, &content).await {
                        Ok(()) => {
                            info!(stage = stage.name(), chunked, "stage complete");
                            if stage == AnalysisStage::ExecutiveSummary {
                                produced_exec = Some(output);
                            }
                            jobs[idx].status = JobStatus::Succeeded;
                        }
                        Err(e) => jobs[idx].status = JobStatus::Failed(e.to_string()),
                    }

                    pending_delay = Some(Duration::from_secs(if chunked {
                        self.pipeline.chunked_stage_delay_seconds
                    } else {
                        self.pipeline.inter_stage_delay_seconds
                    }));
                }
                Err(StageError::Cancelled) => {
                    info!(stage = stage.name(), "cancelled, leaving stage pending");
                    jobs[idx].status = JobStatus::Pending;
                    break;
                }
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "stage failed");
                    jobs[idx].status = JobStatus::Failed(e.to_string());
                    pending_delay =
                        Some(Duration::from_secs(self.pipeline.inter_stage_delay_seconds));
                }
            }
        }

        SessionReport {
            session_id: session_id.to_string(),
            jobs,
        }
    }

    /// Produce one stage's output. Returns the text and whether chunking
    /// was needed, which selects the longer post-stage delay.
    async fn run_stage(
        &self,
        stage: AnalysisStage,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, bool), StageError> {
        let ceiling = self.pipeline.per_call_token_ceiling.max(1);

        if estimate_tokens(input) <= ceiling {
            let prompt = stage.build_prompt(input);
            match self.call_with_retry(&prompt, cancel).await {
                Ok(output) => return Ok((output, false)),
                // The provider's oversize verdict overrides the estimate.
                Err(StageError::InputTooLarge(reason)) => {
                    warn!(
                        stage = stage.name(),
                        reason,
                        "provider rejected whole input, falling back to chunking"
                    );
                    let output = self.run_chunked(stage, input, ceiling / 2, cancel).await?;
                    return Ok((output, true));
                }
                Err(e) => return Err(e),
            }
        }

        let output = self.run_chunked(stage, input, ceiling, cancel).await?;
        Ok((output, true))
    }

    /// Split the input, process the chunks sequentially with inter-call
    /// pacing, and combine the partial results per the stage's policy.
    async fn run_chunked(
        &self,
        stage: AnalysisStage,
        input: &str,
        ceiling: u64,
        cancel: &CancellationToken,
    ) -> Result<String, StageError> {
        let chunks = chunker::split(input, ceiling.max(1));
        let total = chunks.len();
        info!(stage = stage.name(), chunks = total, ceiling, "processing chunked input");

        let inter_call = Duration::from_secs(self.pipeline.inter_call_delay_seconds);
        let mut partials = Vec::with_capacity(total);
        for chunk in &chunks {
            if chunk.index > 0 {
                self.pause(inter_call, cancel).await?;
            }
            let partial = self
                .process_chunk(stage, chunk.index, total, &chunk.text, cancel)
                .await?;
            partials.push(partial);
        }

        let merged = partials.join("\n\n");
        match stage.combine_policy() {
            CombinePolicy::Concatenate => Ok(merged),
            CombinePolicy::Reduce => {
                let reduce_prompt = stage.build_reduce_prompt(&merged);
                if estimate_tokens(&reduce_prompt) > self.pipeline.per_call_token_ceiling {
                    warn!(
                        stage = stage.name(),
                        "merged partials exceed the call ceiling, keeping concatenation"
                    );
                    return Ok(merged);
                }
                self.pause(inter_call, cancel).await?;
                match self.call_with_retry(&reduce_prompt, cancel).await {
                    Ok(reduced) => Ok(reduced),
                    Err(StageError::Cancelled) => Err(StageError::Cancelled),
                    // A concatenation beats losing the partials.
                    Err(e) => {
                        warn!(stage = stage.name(), error = %e, "merge call failed, keeping concatenation");
                        Ok(merged)
                    }
                }
            }
        }
    }

    /// Process one chunk. A provider too-large rejection triggers re-splits
    /// with a halving ceiling, up to `max_resplit_attempts`. Results of
    /// sub-chunks that already succeeded are kept; only the text from the
    /// rejected sub-chunk onward is split again.
    async fn process_chunk(
        &self,
        stage: AnalysisStage,
        index: usize,
        total: usize,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, StageError> {
        let prompt = stage.build_chunk_prompt(index, total, text);
        let mut last_reason = match self.call_with_retry(&prompt, cancel).await {
            Err(StageError::InputTooLarge(reason)) => reason,
            other => return other,
        };

        let inter_call = Duration::from_secs(self.pipeline.inter_call_delay_seconds);
        let mut parts: Vec<String> = Vec::new();
        let mut remaining = text.to_string();
        let mut ceiling = (estimate_tokens(text) / 2).max(1);
        for _ in 0..self.pipeline.max_resplit_attempts {
            warn!(stage = stage.name(), index, ceiling, "re-splitting rejected chunk");
            let sub_chunks = chunker::split(&remaining, ceiling);
            let pass_total = parts.len() + sub_chunks.len();
            let mut rejected_at: Option<usize> = None;
            for (pos, sub) in sub_chunks.iter().enumerate() {
                if parts.len() + pos > 0 {
                    self.pause(inter_call, cancel).await?;
                }
                let prompt = stage.build_chunk_prompt(parts.len(), pass_total, &sub.text);
                match self.call_with_retry(&prompt, cancel).await {
                    Ok(part) => parts.push(part),
                    Err(StageError::InputTooLarge(reason)) => {
                        last_reason = reason;
                        rejected_at = Some(pos);
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            match rejected_at {
                None => return Ok(parts.join("\n\n")),
                Some(pos) => {
                    // Chunking is lossless, so the concatenated tail is
                    // exactly the unprocessed remainder of the text.
                    remaining = sub_chunks[pos..]
                        .iter()
                        .map(|c| c.text.as_str())
                        .collect();
                    ceiling = (ceiling / 2).max(1);
                }
            }
        }
        Err(StageError::ChunkingExhausted(last_reason))
    }

    /// One provider call with rate budgeting, a wall-clock timeout, and
    /// per-class retry budgets. Every attempt reserves budget for its own
    /// tokens; cancellation is honored before the call and during backoff,
    /// never mid-request.
    async fn call_with_retry(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, StageError> {
        let estimated = estimate_tokens(prompt);
        let timeout = Duration::from_secs(self.pipeline.call_timeout_seconds);
        let mut rate_limited_attempts = 0u32;
        let mut transient_attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }
            self.limiter.reserve(estimated).await;
            if cancel.is_cancelled() {
                return Err(StageError::Cancelled);
            }

            let result = match tokio::time::timeout(timeout, self.provider.complete(prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Transient(format!(
                    "call timeout after {}s",
                    timeout.as_secs()
                ))),
            };

            let err = match result {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };

            let (class, hint) = match &err {
                ProviderError::RateLimited { retry_after, .. } => {
                    (RetryClass::RateLimited, *retry_after)
                }
                ProviderError::Transient(_) => (RetryClass::Transient, None),
                ProviderError::InputTooLarge(reason) => {
                    return Err(StageError::InputTooLarge(reason.clone()));
                }
                ProviderError::Fatal(reason) => return Err(StageError::Fatal(reason.clone())),
            };

            let attempt = match class {
                RetryClass::RateLimited => {
                    rate_limited_attempts += 1;
                    rate_limited_attempts
                }
                RetryClass::Transient => {
                    transient_attempts += 1;
                    transient_attempts
                }
            };

            match self.backoff.delay_for(class, attempt, hint) {
                Some(delay) => {
                    warn!(
                        ?class,
                        attempt,
                        delay_s = delay.as_secs(),
                        error = %err,
                        "provider call failed, backing off"
                    );
                    self.pause(delay, cancel).await?;
                }
                None => return Err(StageError::RetriesExhausted(err.to_string())),
            }
        }
    }

    /// Sleep that aborts with `Cancelled` when the token fires.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), StageError> {
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = cancel.cancelled() => Err(StageError::Cancelled),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests (paused tokio clock, so delays and backoff elapse virtually)
// ─────────────────────────────────────────────────────────────────────────────
