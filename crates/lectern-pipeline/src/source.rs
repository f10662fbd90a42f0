//! Transcript sources.

use std::path::PathBuf;

use async_trait::async_trait;
use lectern_core::segment::TranscriptSegment;
use lectern_core::vtt::{self, VttError};
use tracing::debug;

/// Errors raised while loading a transcript.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No transcript exists for the session.
    #[error("no transcript found for session {0}")]
    NotFound(String),

    /// Transcript file could not be read.
    #[error("failed to read transcript: {0}")]
    Io(#[from] std::io::Error),

    /// Transcript file is not valid WebVTT.
    #[error("failed to parse transcript: {0}")]
    Parse(#[from] VttError),
}

/// Provides transcript segments for a session.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Load the merged, ordered segments for `session_id`.
    async fn list_segments(&self, session_id: &str) -> Result<Vec<TranscriptSegment>, SourceError>;
}

/// Reads `<dir>/<session_id>.vtt` files.
pub struct VttDirSource {
    dir: PathBuf,
}

impl VttDirSource {
    /// A source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TranscriptSource for VttDirSource {
    async fn list_segments(&self, session_id: &str) -> Result<Vec<TranscriptSegment>, SourceError> {
        let path = self.dir.join(format!("{session_id}.vtt"));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(session_id.to_string()));
            }
            Err(e) => return Err(SourceError::Io(e)),
        };
        let segments = vtt::merge_consecutive(vtt::parse_vtt(&raw)?);
        debug!(session_id, segments = segments.len(), "loaded transcript");
        Ok(segments)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = "WEBVTT\n\n\
        1\n00:00:01.000 --> 00:00:04.000\nDana Rivera: Welcome back everyone.\n\n\
        2\n00:00:04.000 --> 00:00:07.000\nDana Rivera: Today we cover fractions.\n\n\
        3\n00:00:07.500 --> 00:00:09.000\nJordan: I have a question.\n";

    #[tokio::test]
    async fn reads_and_merges_vtt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("algebra-01.vtt"), SAMPLE).unwrap();

        let source = VttDirSource::new(dir.path());
        let segments = source.list_segments("algebra-01").await.unwrap();

        // Consecutive Dana Rivera turns merge into one segment.
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speaker, "Dana Rivera");
        assert_eq!(
            segments[0].text,
            "Welcome back everyone. Today we cover fractions."
        );
        assert_eq!(segments[1].speaker, "Jordan");
    }

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = VttDirSource::new(dir.path());
        let err = source.list_segments("nope").await.unwrap_err();
        assert_matches!(err, SourceError::NotFound(id) if id == "nope");
    }

    #[tokio::test]
    async fn malformed_file_maps_to_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.vtt"), "not a vtt file").unwrap();
        let source = VttDirSource::new(dir.path());
        assert_matches!(
            source.list_segments("bad").await.unwrap_err(),
            SourceError::Parse(_)
        );
    }
}
