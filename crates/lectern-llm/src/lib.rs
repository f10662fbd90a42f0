//! # lectern-llm
//!
//! Everything that sits between the pipeline and the completion provider:
//!
//! - **Provider**: [`provider::Provider`] trait with a closed
//!   [`provider::ProviderError`] failure taxonomy
//! - **Anthropic**: [`anthropic::AnthropicProvider`] HTTP implementation
//! - **Tokens**: [`tokens::estimate_tokens`] character-based estimation
//! - **Chunker**: [`chunker::split`] boundary-preserving oversized-input splitting
//! - **Rate limiter**: [`rate_limit::RateLimiter`] rolling token window
//! - **Backoff**: [`backoff::BackoffPolicy`] retry classification and delays
//!
//! ## Crate Position
//!
//! Depends on nothing internal. Depended on by lectern-pipeline.

#![deny(unsafe_code)]

pub mod anthropic;
pub mod backoff;
pub mod chunker;
pub mod provider;
pub mod rate_limit;
pub mod tokens;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use backoff::{BackoffPolicy, RetryClass};
pub use chunker::{Chunk, split};
pub use provider::{Provider, ProviderError, ProviderResult};
pub use rate_limit::RateLimiter;
pub use tokens::estimate_tokens;
