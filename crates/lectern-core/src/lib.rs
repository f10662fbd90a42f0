//! # lectern-core
//!
//! Foundation types for the lectern analysis pipeline.
//!
//! - **Segments**: [`segment::TranscriptSegment`] and prompt-ready formatting
//! - **VTT**: [`vtt::parse_vtt`] WEBVTT cue parsing and same-speaker merging
//! - **Stats**: [`stats::SessionStats`] per-speaker engagement aggregation
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other lectern crates.

#![deny(unsafe_code)]

pub mod segment;
pub mod stats;
pub mod vtt;

pub use segment::{TranscriptSegment, format_timestamp, format_transcript};
pub use stats::{SessionStats, SpeakerStat};
pub use vtt::{VttError, merge_consecutive, parse_vtt};
