//! Stage-level errors.

use crate::artifact::StoreError;
use crate::source::SourceError;

/// Why a single stage of a session gave up.
///
/// A stage error never aborts the other stages of the session; the
/// orchestrator records it on the job and moves on.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A required upstream artifact is absent and could not be produced.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// Provider rejected the request in a way retries cannot fix.
    #[error("fatal provider error: {0}")]
    Fatal(String),

    /// Provider rejected the input as too large before chunking could engage.
    #[error("input too large: {0}")]
    InputTooLarge(String),

    /// Retry budget exhausted; the last provider error is included.
    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),

    /// Re-splitting halved the ceiling to the attempt limit and the
    /// provider still rejected the smallest chunk.
    #[error("chunking exhausted: {0}")]
    ChunkingExhausted(String),

    /// Transcript could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Artifact store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cancellation was requested between provider calls.
    #[error("cancelled")]
    Cancelled,
}
