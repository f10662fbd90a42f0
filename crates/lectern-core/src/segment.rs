//! Transcript segment model and prompt-ready formatting.

use serde::{Deserialize, Serialize};

/// Fallback speaker label for cues without a speaker tag.
pub const UNKNOWN_SPEAKER: &str = "Unknown Speaker";

/// One speaker turn from a session transcript.
///
/// Segments are ordered chronologically by `start_seconds`. `start <= end`
/// is expected but not enforced; overlapping or zero-length segments are
/// tolerated and never corrected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Speaker name, empty when the cue carried no speaker tag.
    pub speaker: String,
    /// Cue start, seconds from session start.
    pub start_seconds: f64,
    /// Cue end, seconds from session start.
    pub end_seconds: f64,
    /// Spoken text.
    pub text: String,
}

impl TranscriptSegment {
    /// Speaking duration in seconds. Negative spans clamp to zero so that
    /// per-speaker sums always equal the session total.
    pub fn duration_seconds(&self) -> f64 {
        (self.end_seconds - self.start_seconds).max(0.0)
    }

    /// Speaker label with the unknown fallback applied.
    pub fn speaker_label(&self) -> &str {
        if self.speaker.is_empty() {
            UNKNOWN_SPEAKER
        } else {
            &self.speaker
        }
    }
}

/// Render seconds-from-start as `HH:MM:SS.mmm`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Format segments into the prompt text sent to the provider.
///
/// One line per segment, `[start - end] Speaker: text`, joined with blank
/// lines so speaker turns stay visible as chunking boundaries.
pub fn format_transcript(segments: &[TranscriptSegment]) -> String {
    let lines: Vec<String> = segments
        .iter()
        .map(|seg| {
            format!(
                "[{} - {}] {}: {}",
                format_timestamp(seg.start_seconds),
                format_timestamp(seg.end_seconds),
                seg.speaker_label(),
                seg.text
            )
        })
        .collect();
    lines.join("\n\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            speaker: speaker.to_string(),
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn duration_positive_span() {
        assert_eq!(seg("A", 1.0, 3.5, "x").duration_seconds(), 2.5);
    }

    #[test]
    fn duration_zero_span() {
        assert_eq!(seg("A", 2.0, 2.0, "x").duration_seconds(), 0.0);
    }

    #[test]
    fn duration_negative_span_clamps() {
        assert_eq!(seg("A", 5.0, 3.0, "x").duration_seconds(), 0.0);
    }

    #[test]
    fn speaker_label_fallback() {
        assert_eq!(seg("", 0.0, 1.0, "x").speaker_label(), UNKNOWN_SPEAKER);
        assert_eq!(seg("Dana", 0.0, 1.0, "x").speaker_label(), "Dana");
    }

    #[test]
    fn timestamp_zero() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
    }

    #[test]
    fn timestamp_hours_minutes() {
        assert_eq!(format_timestamp(3723.25), "01:02:03.250");
    }

    #[test]
    fn timestamp_negative_clamps() {
        assert_eq!(format_timestamp(-1.0), "00:00:00.000");
    }

    #[test]
    fn format_transcript_line_shape() {
        let text = format_transcript(&[seg("Dana", 0.0, 2.0, "Hello everyone")]);
        assert_eq!(text, "[00:00:00.000 - 00:00:02.000] Dana: Hello everyone");
    }

    #[test]
    fn format_transcript_blank_line_joins() {
        let text = format_transcript(&[
            seg("Dana", 0.0, 2.0, "Hello"),
            seg("", 2.0, 4.0, "Hi there"),
        ]);
        let parts: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[1].contains("Unknown Speaker: Hi there"));
    }

    #[test]
    fn format_transcript_empty() {
        assert_eq!(format_transcript(&[]), "");
    }

    #[test]
    fn segment_serde_roundtrip() {
        let s = seg("Dana", 1.0, 2.0, "hi");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["startSeconds"], 1.0);
        assert_eq!(json["speaker"], "Dana");
        let back: TranscriptSegment = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
