//! Structured JSON ("json3") caption parser.
//!
//! Bodies are a JSON object with a top-level `events` array. Each event may
//! carry text runs in `segs[].utf8`, a start offset in `tStartMs`, and a
//! duration in `dDurationMs`. Events without text runs are window/format
//! bookkeeping and are skipped.

use super::ParseOutcome;
use crate::types::TranscriptSegment;
use serde_json::Value;

pub fn parse(raw: &str) -> ParseOutcome {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(_) => return ParseOutcome::NotApplicable,
    };
    let Some(events) = value.get("events") else {
        return ParseOutcome::NotApplicable;
    };
    let Some(events) = events.as_array() else {
        return ParseOutcome::Malformed;
    };

    let mut segments = Vec::new();
    for event in events {
        let Some(event) = event.as_object() else {
            return ParseOutcome::Malformed;
        };
        let text = event
            .get("segs")
            .and_then(Value::as_array)
            .map(|segs| {
                segs.iter()
                    .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }
        let Some(start_ms) = event.get("tStartMs").and_then(Value::as_f64) else {
            // A text-bearing event without a start offset is a broken body.
            return ParseOutcome::Malformed;
        };
        let duration_ms = event
            .get("dDurationMs")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        if let Some(segment) =
            TranscriptSegment::new(&text, start_ms / 1000.0, duration_ms / 1000.0)
        {
            segments.push(segment);
        }
    }
    ParseOutcome::Parsed(segments)
}
