//! Completion provider trait and failure taxonomy.

use std::time::Duration;

use async_trait::async_trait;

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Closed set of provider call failures.
///
/// Every call site matches on this exhaustively; there is no untyped
/// escape hatch. Retryability is decided by the backoff policy, except
/// for [`ProviderError::Fatal`] which is never retried and
/// [`ProviderError::InputTooLarge`] which triggers a chunk re-split
/// instead of a retry.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider throttled the call (HTTP 429 class).
    #[error("provider rate limited: {message}")]
    RateLimited {
        /// Provider-reported wait hint, when present.
        retry_after: Option<Duration>,
        /// Provider-reported reason.
        message: String,
    },

    /// Network, timeout, or provider-side transient failure (5xx class).
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The provider rejected the input as exceeding its context budget.
    /// Authoritative over any local token estimate.
    #[error("input too large: {0}")]
    InputTooLarge(String),

    /// Authentication failure, malformed request, or permanent content
    /// rejection. Never retried; surfaced to the caller unchanged.
    #[error("fatal provider failure: {0}")]
    Fatal(String),
}

/// A completion-generating endpoint: submit a prompt, get text back.
///
/// Implementations must be cheap to share behind an `Arc`; the pipeline
/// calls `complete` from many session tasks concurrently.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> ProviderResult<String>;
}
