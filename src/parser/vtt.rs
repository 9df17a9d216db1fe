//! WebVTT cue-sheet parser.
//!
//! Requires the `WEBVTT` header line. A cue is a `start --> end` timing
//! line followed by one or more text lines, terminated by a blank line.
//! Numeric cue identifiers and NOTE/STYLE/REGION blocks are skipped, and
//! inline `<…>` markup is stripped from cue text.

use super::{collapse_whitespace, parse_timestamp, ParseOutcome};
use crate::types::TranscriptSegment;

pub fn parse(raw: &str) -> ParseOutcome {
    let body = raw.trim_start_matches('\u{feff}');
    let mut lines = body.lines();
    let header = loop {
        match lines.next() {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line.trim(),
            None => return ParseOutcome::NotApplicable,
        }
    };
    if !header.to_ascii_uppercase().starts_with("WEBVTT") {
        return ParseOutcome::NotApplicable;
    }

    let mut segments = Vec::new();
    let mut bad_timings = 0usize;
    let mut skipping_block = false;
    let mut current: Option<(f64, f64, Vec<String>)> = None;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            skipping_block = false;
            flush(&mut current, &mut segments);
            continue;
        }
        if skipping_block {
            continue;
        }
        if let Some((start, duration)) = parse_timing_line(trimmed) {
            flush(&mut current, &mut segments);
            current = Some((start, duration, Vec::new()));
            continue;
        }
        if trimmed.contains("-->") {
            // Looks like a timing line but does not parse.
            bad_timings += 1;
            continue;
        }
        match current.as_mut() {
            Some((_, _, text)) => text.push(strip_markup(trimmed)),
            None => {
                if trimmed.starts_with("NOTE")
                    || trimmed.starts_with("STYLE")
                    || trimmed.starts_with("REGION")
                {
                    skipping_block = true;
                }
                // Anything else outside a cue is an identifier line; the
                // next timing line opens its cue.
            }
        }
    }
    flush(&mut current, &mut segments);

    // Only broken timing lines make the body malformed; a cue sheet whose
    // cues all carry empty text is valid and empty.
    if bad_timings > 0 && segments.is_empty() {
        return ParseOutcome::Malformed;
    }
    ParseOutcome::Parsed(segments)
}

fn flush(current: &mut Option<(f64, f64, Vec<String>)>, segments: &mut Vec<TranscriptSegment>) {
    if let Some((start, duration, text)) = current.take() {
        let text = collapse_whitespace(&text.join(" "));
        if let Some(segment) = TranscriptSegment::new(&text, start, duration) {
            segments.push(segment);
        }
    }
}

/// Parse `start --> end [settings]` into (start, duration).
fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.trim().split_whitespace().next()?;
    let start = parse_timestamp(start.trim())?;
    let end = parse_timestamp(end)?;
    Some((start, (end - start).max(0.0)))
}

/// Drop inline `<…>` tags (voice spans, timestamps, styling).
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}
