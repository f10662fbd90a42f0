//! # lectern-settings
//!
//! Configuration for the lectern pipeline, loaded from three layers (in
//! priority order):
//!
//! 1. **Compiled defaults**: [`LecternSettings::default()`]
//! 2. **Settings file**: optional JSON, missing fields fall back to defaults
//! 3. **Environment variables**: `LECTERN_*` overrides (highest priority)
//!
//! The rate-budget default sits at ~75% of a nominal 80k tokens/minute
//! provider ceiling to absorb token-estimation error.

#![deny(unsafe_code)]

pub mod types;

pub use types::{
    LecternSettings, LimiterSettings, PipelineSettings, ProviderSettings, RetrySettings,
};

use std::path::Path;

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON for [`LecternSettings`].
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load settings from an optional JSON file, then apply env overrides.
///
/// A `None` path yields compiled defaults plus env overrides.
pub fn load_settings(path: Option<&Path>) -> Result<LecternSettings, SettingsError> {
    let mut settings = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)?;
            serde_json::from_str(&raw)?
        }
        None => LecternSettings::default(),
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Apply `LECTERN_*` environment overrides in place. Every numeric field
/// of the limiter, retry, and pipeline sections has a matching variable
/// named after its screaming-snake-case field name.
fn apply_env_overrides(settings: &mut LecternSettings) {
    if let Ok(key) = std::env::var("LECTERN_API_KEY") {
        settings.provider.api_key = key;
    }
    if let Ok(model) = std::env::var("LECTERN_MODEL") {
        settings.provider.model = model;
    }
    if let Ok(url) = std::env::var("LECTERN_BASE_URL") {
        settings.provider.base_url = Some(url);
    }
    env_override("LECTERN_MAX_OUTPUT_TOKENS", &mut settings.provider.max_output_tokens);

    env_override(
        "LECTERN_MAX_TOKENS_PER_WINDOW",
        &mut settings.limiter.max_tokens_per_window,
    );
    env_override(
        "LECTERN_WINDOW_LENGTH_SECONDS",
        &mut settings.limiter.window_length_seconds,
    );

    env_override(
        "LECTERN_BASE_RETRY_DELAY_SECONDS",
        &mut settings.retry.base_retry_delay_seconds,
    );
    env_override(
        "LECTERN_MAX_RETRY_DELAY_SECONDS",
        &mut settings.retry.max_retry_delay_seconds,
    );
    env_override("LECTERN_MAX_RETRY_ATTEMPTS", &mut settings.retry.max_retry_attempts);
    env_override(
        "LECTERN_TRANSIENT_RETRY_DELAY_SECONDS",
        &mut settings.retry.transient_retry_delay_seconds,
    );
    env_override(
        "LECTERN_TRANSIENT_MAX_RETRY_ATTEMPTS",
        &mut settings.retry.transient_max_retry_attempts,
    );
    env_override("LECTERN_JITTER_FRACTION", &mut settings.retry.jitter_fraction);

    env_override(
        "LECTERN_PER_CALL_TOKEN_CEILING",
        &mut settings.pipeline.per_call_token_ceiling,
    );
    env_override(
        "LECTERN_INTER_CALL_DELAY_SECONDS",
        &mut settings.pipeline.inter_call_delay_seconds,
    );
    env_override(
        "LECTERN_INTER_STAGE_DELAY_SECONDS",
        &mut settings.pipeline.inter_stage_delay_seconds,
    );
    env_override(
        "LECTERN_CHUNKED_STAGE_DELAY_SECONDS",
        &mut settings.pipeline.chunked_stage_delay_seconds,
    );
    env_override(
        "LECTERN_CALL_TIMEOUT_SECONDS",
        &mut settings.pipeline.call_timeout_seconds,
    );
    env_override(
        "LECTERN_MAX_RESPLIT_ATTEMPTS",
        &mut settings.pipeline.max_resplit_attempts,
    );
    env_override(
        "LECTERN_MAX_CONCURRENT_SESSIONS",
        &mut settings.pipeline.max_concurrent_sessions,
    );
}

/// Overwrite `slot` with the parsed value of `name` when the variable is
/// set; unparseable values are logged and ignored.
fn env_override<T: std::str::FromStr>(name: &str, slot: &mut T)
where
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(name) {
        match raw.parse() {
            Ok(v) => *slot = v,
            Err(e) => tracing::warn!(name, raw, error = %e, "ignoring invalid environment override"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let settings = LecternSettings::default();
        assert_eq!(settings.limiter.max_tokens_per_window, 60_000);
        assert_eq!(settings.limiter.window_length_seconds, 60);
        assert_eq!(settings.retry.base_retry_delay_seconds, 120);
        assert_eq!(settings.pipeline.per_call_token_ceiling, 30_000);
        assert_eq!(settings.provider.model, "claude-3-7-sonnet-20250219");
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"limiter": {{"maxTokensPerWindow": 12000}}, "provider": {{"model": "claude-3-opus-20240229"}}}}"#
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.limiter.max_tokens_per_window, 12_000);
        // Unspecified fields keep defaults.
        assert_eq!(settings.limiter.window_length_seconds, 60);
        assert_eq!(settings.provider.model, "claude-3-opus-20240229");
        assert_eq!(settings.retry.max_retry_attempts, 5);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_settings(Some(file.path())),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_settings(Some(Path::new("/nonexistent/settings.json"))),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn env_overrides_reach_retry_and_pipeline_fields() {
        std::env::set_var("LECTERN_BASE_RETRY_DELAY_SECONDS", "45");
        std::env::set_var("LECTERN_PER_CALL_TOKEN_CEILING", "9000");
        std::env::set_var("LECTERN_INTER_STAGE_DELAY_SECONDS", "11");
        std::env::set_var("LECTERN_JITTER_FRACTION", "0.5");
        std::env::set_var("LECTERN_MAX_CONCURRENT_SESSIONS", "not a number");

        let mut settings = LecternSettings::default();
        apply_env_overrides(&mut settings);

        std::env::remove_var("LECTERN_BASE_RETRY_DELAY_SECONDS");
        std::env::remove_var("LECTERN_PER_CALL_TOKEN_CEILING");
        std::env::remove_var("LECTERN_INTER_STAGE_DELAY_SECONDS");
        std::env::remove_var("LECTERN_JITTER_FRACTION");
        std::env::remove_var("LECTERN_MAX_CONCURRENT_SESSIONS");

        assert_eq!(settings.retry.base_retry_delay_seconds, 45);
        assert_eq!(settings.pipeline.per_call_token_ceiling, 9000);
        assert_eq!(settings.pipeline.inter_stage_delay_seconds, 11);
        assert!((settings.retry.jitter_fraction - 0.5).abs() < f64::EPSILON);
        // Unparseable values are ignored.
        assert_eq!(settings.pipeline.max_concurrent_sessions, 4);
    }

    #[test]
    fn api_key_never_serialized() {
        let mut settings = LecternSettings::default();
        settings.provider.api_key = "secret".into();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }
}
