//! Artifact persistence.
//!
//! Artifacts are keyed by `(session_id, stage)`; an existing artifact means
//! the stage is done and will be skipped on re-runs.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::stage::AnalysisStage;

/// Errors raised by an artifact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Artifact does not exist.
    #[error("artifact {artifact} not found for session {session_id}")]
    NotFound {
        /// Session identifier.
        session_id: String,
        /// Artifact file name.
        artifact: &'static str,
    },

    /// Underlying I/O failure.
    #[error("artifact store i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists stage outputs.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether the artifact for `(session_id, stage)` already exists.
    async fn exists(&self, session_id: &str, stage: AnalysisStage) -> Result<bool, StoreError>;

    /// Write the artifact, replacing any previous content.
    async fn write(
        &self,
        session_id: &str,
        stage: AnalysisStage,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Read the artifact back.
    async fn read(&self, session_id: &str, stage: AnalysisStage) -> Result<String, StoreError>;
}

/// Filesystem store writing `<root>/<session_id>/<artifact_name>`.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// A store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, session_id: &str, stage: AnalysisStage) -> PathBuf {
        self.root.join(session_id).join(stage.artifact_name())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn exists(&self, session_id: &str, stage: AnalysisStage) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(session_id, stage)).await?)
    }

    async fn write(
        &self,
        session_id: &str,
        stage: AnalysisStage,
        content: &str,
    ) -> Result<(), StoreError> {
        let path = self.path_for(session_id, stage);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(session_id, artifact = stage.artifact_name(), "wrote artifact");
        Ok(())
    }

    async fn read(&self, session_id: &str, stage: AnalysisStage) -> Result<String, StoreError> {
        let path = self.path_for(session_id, stage);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                session_id: session_id.to_string(),
                artifact: stage.artifact_name(),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
