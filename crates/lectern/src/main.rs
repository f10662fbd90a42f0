//! # lectern
//!
//! Command-line entry point. Analyzes session transcripts through the
//! staged, rate-limited pipeline and writes one artifact folder per session.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use lectern_llm::{AnthropicConfig, AnthropicProvider, BackoffPolicy, RateLimiter};
use lectern_pipeline::{FsArtifactStore, JobStatus, Orchestrator, VttDirSource};
use lectern_settings::{LecternSettings, RetrySettings};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Transcript analysis pipeline.
#[derive(Parser, Debug)]
#[command(name = "lectern", about = "Analyze session transcripts with an LLM")]
struct Cli {
    /// Directory of `<session-id>.vtt` transcripts.
    #[arg(long)]
    transcripts: PathBuf,

    /// Output root; artifacts land in `<out>/<session-id>/`.
    #[arg(long)]
    out: PathBuf,

    /// Optional JSON settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Session id to process (repeatable). Defaults to every transcript
    /// found under --transcripts.
    #[arg(long = "session")]
    sessions: Vec<String>,

    /// Log filter (overridden by RUST_LOG when set).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Session ids derived from `*.vtt` file names, sorted.
fn discover_sessions(dir: &Path) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read transcript directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "vtt") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Map retry settings onto the backoff policy.
fn backoff_from(retry: &RetrySettings) -> BackoffPolicy {
    BackoffPolicy {
        base_delay: Duration::from_secs(retry.base_retry_delay_seconds),
        max_delay: Duration::from_secs(retry.max_retry_delay_seconds),
        max_attempts: retry.max_retry_attempts,
        transient_base_delay: Duration::from_secs(retry.transient_retry_delay_seconds),
        transient_max_attempts: retry.transient_max_retry_attempts,
        jitter_fraction: retry.jitter_fraction,
    }
}

fn build_orchestrator(settings: &LecternSettings, args: &Cli) -> Orchestrator {
    let provider = Arc::new(AnthropicProvider::new(AnthropicConfig {
        api_key: settings.provider.api_key.clone(),
        model: settings.provider.model.clone(),
        base_url: settings.provider.base_url.clone(),
        max_output_tokens: settings.provider.max_output_tokens,
    }));
    let limiter = Arc::new(RateLimiter::new(
        settings.limiter.max_tokens_per_window,
        Duration::from_secs(settings.limiter.window_length_seconds),
    ));
    Orchestrator::new(
        provider,
        Arc::new(VttDirSource::new(args.transcripts.clone())),
        Arc::new(FsArtifactStore::new(args.out.clone())),
        limiter,
        backoff_from(&settings.retry),
        settings.pipeline.clone(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = lectern_settings::load_settings(args.settings.as_deref())
        .context("failed to load settings")?;
    if settings.provider.api_key.is_empty() {
        bail!("no API key configured (set LECTERN_API_KEY)");
    }

    let sessions = if args.sessions.is_empty() {
        discover_sessions(&args.transcripts)?
    } else {
        args.sessions.clone()
    };
    if sessions.is_empty() {
        bail!("no transcripts found under {}", args.transcripts.display());
    }
    tracing::info!(
        sessions = sessions.len(),
        model = settings.provider.model.as_str(),
        "starting analysis run"
    );

    let orchestrator = Arc::new(build_orchestrator(&settings, &args));

    // Ctrl-C requests cooperative cancellation; in-flight provider calls
    // finish, everything else stays pending for the next run.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing in-flight calls");
            signal_cancel.cancel();
        }
    });

    let summary = orchestrator.run(&sessions, cancel).await;

    for report in &summary.reports {
        for job in &report.jobs {
            match &job.status {
                JobStatus::Failed(reason) => tracing::warn!(
                    session_id = report.session_id.as_str(),
                    stage = job.stage.name(),
                    reason,
                    "stage failed"
                ),
                status => tracing::info!(
                    session_id = report.session_id.as_str(),
                    stage = job.stage.name(),
                    status = ?status,
                    "stage outcome"
                ),
            }
        }
    }
    tracing::info!(
        completed = summary.completed,
        partial = summary.partial,
        "run finished"
    );

    if summary.partial > 0 {
        bail!(
            "{} of {} sessions incomplete; re-run to resume",
            summary.partial,
            summary.completed + summary.partial
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
