//! WEBVTT transcript parsing.
//!
//! Parses the cue format Zoom exports: an optional numeric cue id, a
//! `HH:MM:SS.mmm --> HH:MM:SS.mmm` timing line, then one or more payload
//! lines of `Speaker: text` (speaker tag optional).

use crate::segment::TranscriptSegment;

/// Errors raised while parsing a VTT document.
#[derive(Debug, thiserror::Error)]
pub enum VttError {
    /// The document does not start with a `WEBVTT` header.
    #[error("missing WEBVTT header")]
    MissingHeader,

    /// A timing line could not be parsed.
    #[error("invalid timing line: {0}")]
    InvalidTiming(String),
}

/// Parse a WEBVTT document into ordered transcript segments.
///
/// Cues with empty payloads are dropped. Cue order is preserved as written,
/// which is chronological in every exporter we consume.
pub fn parse_vtt(input: &str) -> Result<Vec<TranscriptSegment>, VttError> {
    let mut lines = input.lines().peekable();

    match lines.next().map(|l| l.trim_start_matches('\u{feff}')) {
        Some(first) if first.trim_start().starts_with("WEBVTT") => {}
        _ => return Err(VttError::MissingHeader),
    }

    let mut segments = Vec::new();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if !line.contains("-->") {
            continue; // blank line, cue id, NOTE block
        }

        let (start, end) = parse_timing_line(line)?;

        // Payload: all lines until the next blank line.
        let mut payload = String::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            if !payload.is_empty() {
                payload.push(' ');
            }
            payload.push_str(lines.next().unwrap_or_default().trim());
        }

        if payload.is_empty() {
            continue;
        }

        let (speaker, text) = split_speaker(&payload);
        segments.push(TranscriptSegment {
            speaker,
            start_seconds: start,
            end_seconds: end,
            text,
        });
    }

    Ok(segments)
}

/// Merge consecutive segments from the same speaker into one turn.
///
/// The merged segment spans from the first start to the last end, with
/// texts joined by a single space.
pub fn merge_consecutive(segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let mut merged: Vec<TranscriptSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(prev) if !seg.speaker.is_empty() && prev.speaker == seg.speaker => {
                prev.end_seconds = seg.end_seconds;
                prev.text.push(' ');
                prev.text.push_str(&seg.text);
            }
            _ => merged.push(seg),
        }
    }
    merged
}

fn parse_timing_line(line: &str) -> Result<(f64, f64), VttError> {
    let mut parts = line.splitn(2, "-->");
    let start = parts
        .next()
        .and_then(|s| parse_timestamp(s.trim()))
        .ok_or_else(|| VttError::InvalidTiming(line.to_string()))?;
    // Trailing cue settings (`align:start` etc.) follow the end timestamp.
    let end = parts
        .next()
        .map(str::trim)
        .and_then(|s| s.split_whitespace().next())
        .and_then(parse_timestamp)
        .ok_or_else(|| VttError::InvalidTiming(line.to_string()))?;
    Ok((start, end))
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let fields: Vec<&str> = ts.split(':').collect();
    let (h, m, s) = match fields.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let secs: f64 = s.parse().ok()?;
    Some(h as f64 * 3600.0 + m as f64 * 60.0 + secs)
}

/// Cue payload labels Zoom emits as meeting metadata, not speech.
const METADATA_LABELS: [&str; 2] = ["meeting title", "hosted by"];

fn split_speaker(payload: &str) -> (String, String) {
    // Zoom uses `Speaker Name: text`. A colon too deep into the line is
    // treated as punctuation, not a speaker tag.
    if let Some(idx) = payload.find(':') {
        let (name, rest) = payload.split_at(idx);
        let name = name.trim();
        if plausible_speaker(name) {
            return (name.to_string(), rest[1..].trim().to_string());
        }
    }
    (String::new(), payload.trim().to_string())
}

/// A colon prefix counts as a speaker tag when it is short, is not a known
/// metadata label, and any period in it is an honorific abbreviation mark
/// (`Ms.`, `Dr.`, `Prof.`) rather than sentence punctuation.
fn plausible_speaker(name: &str) -> bool {
    if name.is_empty() || name.len() > 64 {
        return false;
    }
    let lowered = name.to_ascii_lowercase();
    if METADATA_LABELS.contains(&lowered.as_str()) {
        return false;
    }
    name.split_whitespace().all(|word| {
        !word.contains('.')
            || (word.ends_with('.') && word.len() <= 6 && word.matches('.').count() == 1)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nDana Cruz: Welcome back everyone.\n\n2\n00:00:04.500 --> 00:00:06.000\nDana Cruz: Let's get started.\n\n3\n00:00:06.500 --> 00:00:09.000\nSam Ortiz: Quick question first.\n";

    #[test]
    fn parses_cues_in_order() {
        let segs = parse_vtt(SAMPLE).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].speaker, "Dana Cruz");
        assert_eq!(segs[0].start_seconds, 1.0);
        assert_eq!(segs[0].end_seconds, 4.0);
        assert_eq!(segs[0].text, "Welcome back everyone.");
        assert_eq!(segs[2].speaker, "Sam Ortiz");
    }

    #[test]
    fn missing_header_rejected() {
        assert_matches!(parse_vtt("1\n00:00:01.000 --> 00:00:02.000\nhi\n"), Err(VttError::MissingHeader));
    }

    #[test]
    fn bom_before_header_accepted() {
        let segs = parse_vtt("\u{feff}WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nA: hi\n").unwrap();
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn invalid_timing_rejected() {
        let err = parse_vtt("WEBVTT\n\nbogus --> 00:00:02.000\nhi\n").unwrap_err();
        assert_matches!(err, VttError::InvalidTiming(_));
    }

    #[test]
    fn cue_settings_after_end_timestamp() {
        let segs =
            parse_vtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000 align:start\nA: hi\n").unwrap();
        assert_eq!(segs[0].end_seconds, 2.0);
    }

    #[test]
    fn payload_without_speaker_tag() {
        let segs = parse_vtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n[inaudible]\n").unwrap();
        assert_eq!(segs[0].speaker, "");
        assert_eq!(segs[0].text, "[inaudible]");
    }

    #[test]
    fn metadata_labels_are_not_speakers() {
        let segs = parse_vtt(
            "WEBVTT\n\n00:00:21.000 --> 00:00:25.000\nMeeting title: Advanced Python Programming\n\n00:00:26.000 --> 00:00:30.000\nHosted by: John Smith\n",
        )
        .unwrap();
        assert_eq!(segs[0].speaker, "");
        assert_eq!(segs[0].text, "Meeting title: Advanced Python Programming");
        assert_eq!(segs[1].speaker, "");
        assert_eq!(segs[1].text, "Hosted by: John Smith");
    }

    #[test]
    fn honorific_names_keep_attribution() {
        let segs = parse_vtt(
            "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nMs. Rivera: Let's draw it out.\n\n00:00:04.500 --> 00:00:06.000\nDr. Chen: Agreed.\n",
        )
        .unwrap();
        assert_eq!(segs[0].speaker, "Ms. Rivera");
        assert_eq!(segs[0].text, "Let's draw it out.");
        assert_eq!(segs[1].speaker, "Dr. Chen");
        assert_eq!(segs[1].text, "Agreed.");
    }

    #[test]
    fn interior_periods_before_colon_are_not_speakers() {
        let segs = parse_vtt(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nSee www.example.com: the docs.\n",
        )
        .unwrap();
        assert_eq!(segs[0].speaker, "");
        assert_eq!(segs[0].text, "See www.example.com: the docs.");
    }

    #[test]
    fn multiline_payload_joined() {
        let segs = parse_vtt(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nDana: first line\nsecond line\n",
        )
        .unwrap();
        assert_eq!(segs[0].text, "first line second line");
    }

    #[test]
    fn empty_payload_dropped() {
        let segs = parse_vtt("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n\n").unwrap();
        assert!(segs.is_empty());
    }

    #[test]
    fn mm_ss_timestamps() {
        let segs = parse_vtt("WEBVTT\n\n00:01.500 --> 00:03.000\nA: hi\n").unwrap();
        assert_eq!(segs[0].start_seconds, 1.5);
    }

    #[test]
    fn merge_consecutive_same_speaker() {
        let segs = merge_consecutive(parse_vtt(SAMPLE).unwrap());
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].speaker, "Dana Cruz");
        assert_eq!(segs[0].start_seconds, 1.0);
        assert_eq!(segs[0].end_seconds, 6.0);
        assert_eq!(segs[0].text, "Welcome back everyone. Let's get started.");
    }

    #[test]
    fn merge_keeps_unknown_speakers_separate() {
        let segs = merge_consecutive(vec![
            TranscriptSegment {
                speaker: String::new(),
                start_seconds: 0.0,
                end_seconds: 1.0,
                text: "a".into(),
            },
            TranscriptSegment {
                speaker: String::new(),
                start_seconds: 1.0,
                end_seconds: 2.0,
                text: "b".into(),
            },
        ]);
        assert_eq!(segs.len(), 2);
    }
}
