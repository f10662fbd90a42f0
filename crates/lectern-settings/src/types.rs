//! Settings types with per-field serde defaults.

use serde::{Deserialize, Serialize};

/// Complete settings tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LecternSettings {
    /// Completion provider connection.
    pub provider: ProviderSettings,
    /// Rolling token-budget limiter.
    pub limiter: LimiterSettings,
    /// Retry and backoff policy.
    pub retry: RetrySettings,
    /// Orchestrator pacing and chunking.
    pub pipeline: PipelineSettings,
}

/// Provider connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API key. Populated from `LECTERN_API_KEY`; never written back out.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL override. `None` uses the provider's public endpoint.
    pub base_url: Option<String>,
    /// Maximum completion tokens per call.
    pub max_output_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-3-7-sonnet-20250219".to_string(),
            base_url: None,
            max_output_tokens: 4000,
        }
    }
}

/// Rolling-window rate limiter settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimiterSettings {
    /// Token budget per window. Default is ~75% of a nominal 80k/min
    /// provider ceiling, leaving headroom for estimation error.
    pub max_tokens_per_window: u64,
    /// Window length in seconds.
    pub window_length_seconds: u64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_tokens_per_window: 60_000,
            window_length_seconds: 60,
        }
    }
}

/// Retry and backoff settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// First delay after a provider rate-limit signal, seconds.
    pub base_retry_delay_seconds: u64,
    /// Delay ceiling, seconds.
    pub max_retry_delay_seconds: u64,
    /// Attempt budget for rate-limit failures.
    pub max_retry_attempts: u32,
    /// First delay after a transient failure, seconds.
    pub transient_retry_delay_seconds: u64,
    /// Attempt budget for transient failures.
    pub transient_max_retry_attempts: u32,
    /// Uniform jitter fraction added to each delay.
    pub jitter_fraction: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_retry_delay_seconds: 120,
            max_retry_delay_seconds: 960,
            max_retry_attempts: 5,
            transient_retry_delay_seconds: 5,
            transient_max_retry_attempts: 4,
            jitter_fraction: 0.1,
        }
    }
}

/// Orchestrator pacing, chunking, and concurrency settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Estimated-token ceiling per provider call; inputs above it chunk.
    pub per_call_token_ceiling: u64,
    /// Pause between provider calls within one stage, seconds.
    pub inter_call_delay_seconds: u64,
    /// Pause between stages of one session, seconds.
    pub inter_stage_delay_seconds: u64,
    /// Longer pause after a stage that needed chunking, seconds.
    pub chunked_stage_delay_seconds: u64,
    /// Per-call wall-clock bound; overruns count as transient, seconds.
    pub call_timeout_seconds: u64,
    /// Ceiling-halving re-split attempts after a provider too-large rejection.
    pub max_resplit_attempts: u32,
    /// Sessions processed concurrently.
    pub max_concurrent_sessions: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            per_call_token_ceiling: 30_000,
            inter_call_delay_seconds: 2,
            inter_stage_delay_seconds: 5,
            chunked_stage_delay_seconds: 15,
            call_timeout_seconds: 300,
            max_resplit_attempts: 3,
            max_concurrent_sessions: 4,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_field_names() {
        let json = serde_json::to_value(LecternSettings::default()).unwrap();
        assert!(json["limiter"]["maxTokensPerWindow"].is_u64());
        assert!(json["pipeline"]["perCallTokenCeiling"].is_u64());
        assert!(json["retry"]["jitterFraction"].is_f64());
    }

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let settings: LecternSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.pipeline.max_concurrent_sessions, 4);
        assert_eq!(settings.retry.transient_max_retry_attempts, 4);
    }

    #[test]
    fn budget_below_nominal_ceiling() {
        let limiter = LimiterSettings::default();
        // 75% of the nominal 80k/min limit.
        assert!(limiter.max_tokens_per_window <= 80_000 * 3 / 4);
    }
}
