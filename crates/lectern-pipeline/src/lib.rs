//! # lectern-pipeline
//!
//! The rate-limited, chunked, multi-stage analysis scheduler.
//!
//! - **Stages**: [`stage::AnalysisStage`] enum with prompts, artifact names,
//!   dependencies, and chunk-combination policies
//! - **Jobs**: [`job::AnalysisJob`] per-stage status, [`job::SessionReport`]
//!   and [`job::RunSummary`] user-visible outcomes
//! - **Interfaces**: [`source::TranscriptSource`] and
//!   [`artifact::ArtifactStore`] narrow external collaborators
//! - **Orchestrator**: [`orchestrator::Orchestrator`] per-session stage
//!   loop with rate budgeting, chunking, backoff, and cancellation
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: lectern-core, lectern-llm,
//! lectern-settings. Depended on by the lectern binary.

#![deny(unsafe_code)]

pub mod artifact;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod source;
pub mod stage;

pub use artifact::{ArtifactStore, FsArtifactStore, StoreError};
pub use error::StageError;
pub use job::{AnalysisJob, JobStatus, RunSummary, SessionReport};
pub use orchestrator::Orchestrator;
pub use source::{SourceError, TranscriptSource, VttDirSource};
pub use stage::{AnalysisStage, CombinePolicy};
