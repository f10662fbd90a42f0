//! Per-speaker engagement aggregation.
//!
//! Pure computation from an ordered segment slice; recomputed fresh on
//! every call, never mutated incrementally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::segment::TranscriptSegment;

/// Aggregated engagement numbers for one speaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerStat {
    /// Speaker label (unknown-speaker fallback applied).
    pub speaker: String,
    /// Sum of segment durations, seconds.
    pub total_speaking_seconds: f64,
    /// Whitespace-delimited word count across all segments.
    pub word_count: u64,
    /// Number of segments attributed to this speaker.
    pub segment_count: u64,
}

/// Session-level engagement totals plus the per-speaker breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Total segment count.
    pub segment_count: u64,
    /// Distinct speaker count.
    pub speaker_count: u64,
    /// Total speaking duration, seconds.
    pub total_duration_seconds: f64,
    /// Total word count.
    pub total_word_count: u64,
    /// Per-speaker stats, sorted by speaking time descending.
    pub speakers: Vec<SpeakerStat>,
}

impl SessionStats {
    /// Compute stats from an ordered segment slice.
    ///
    /// Zero- and negative-length segments contribute zero duration but are
    /// still counted, so Σ per-speaker duration equals the session total.
    pub fn compute(segments: &[TranscriptSegment]) -> Self {
        let mut by_speaker: HashMap<&str, SpeakerStat> = HashMap::new();

        for seg in segments {
            let label = seg.speaker_label();
            let stat = by_speaker.entry(label).or_insert_with(|| SpeakerStat {
                speaker: label.to_string(),
                total_speaking_seconds: 0.0,
                word_count: 0,
                segment_count: 0,
            });
            stat.total_speaking_seconds += seg.duration_seconds();
            stat.word_count += seg.text.split_whitespace().count() as u64;
            stat.segment_count += 1;
        }

        let mut speakers: Vec<SpeakerStat> = by_speaker.into_values().collect();
        speakers.sort_by(|a, b| {
            b.total_speaking_seconds
                .partial_cmp(&a.total_speaking_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.speaker.cmp(&b.speaker))
        });

        Self {
            segment_count: segments.len() as u64,
            speaker_count: speakers.len() as u64,
            total_duration_seconds: speakers.iter().map(|s| s.total_speaking_seconds).sum(),
            total_word_count: speakers.iter().map(|s| s.word_count).sum(),
            speakers,
        }
    }

    /// Render a compact text summary of the top `limit` speakers, used as
    /// the engagement-analysis prompt input.
    pub fn summary_lines(&self, limit: usize) -> String {
        self.speakers
            .iter()
            .take(limit)
            .map(|s| {
                format!(
                    "- {}: {} segments, {} words, {:.2} minutes",
                    s.speaker,
                    s.segment_count,
                    s.word_count,
                    s.total_speaking_seconds / 60.0
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
