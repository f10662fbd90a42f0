//! Per-stage job bookkeeping and run-level reporting.

use serde::Serialize;

use crate::stage::AnalysisStage;

/// Lifecycle of one stage within one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not started. Cancelled runs leave jobs here so a re-run picks them up.
    Pending,
    /// Artifact already existed; no provider calls made.
    Skipped,
    /// Provider calls in flight.
    Running,
    /// Artifact written.
    Succeeded,
    /// Stage gave up; the contained reason is user-visible.
    Failed(String),
}

/// One stage of one session.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    /// Session the job belongs to.
    pub session_id: String,
    /// Which analysis this job produces.
    pub stage: AnalysisStage,
    /// Current lifecycle state.
    pub status: JobStatus,
}

impl AnalysisJob {
    /// A fresh pending job.
    pub fn pending(session_id: &str, stage: AnalysisStage) -> Self {
        Self {
            session_id: session_id.to_string(),
            stage,
            status: JobStatus::Pending,
        }
    }
}

/// Outcome of all stages for one session.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Session identifier.
    pub session_id: String,
    /// One job per stage, in execution order.
    pub jobs: Vec<AnalysisJob>,
}

impl SessionReport {
    /// True when every stage either produced its artifact or already had one.
    pub fn is_complete(&self) -> bool {
        self.jobs
            .iter()
            .all(|j| matches!(j.status, JobStatus::Succeeded | JobStatus::Skipped))
    }

    /// Jobs that failed, with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = &AnalysisJob> {
        self.jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Failed(_)))
    }
}

/// Outcome of one orchestrator run across all requested sessions.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Sessions whose every stage succeeded or was skipped.
    pub completed: usize,
    /// Sessions with at least one failed or pending stage.
    pub partial: usize,
    /// Per-session detail, sorted by session id.
    pub reports: Vec<SessionReport>,
}

impl RunSummary {
    /// Build a summary from per-session reports.
    pub fn from_reports(mut reports: Vec<SessionReport>) -> Self {
        reports.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        let completed = reports.iter().filter(|r| r.is_complete()).count();
        let partial = reports.len() - completed;
        Self {
            completed,
            partial,
            reports,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
