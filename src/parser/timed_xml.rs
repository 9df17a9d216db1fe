//! Timed-XML caption parser.
//!
//! Handles two tag dialects over one reader pass:
//! - flat `<text start="1.0" dur="2.5">…</text>` cues with second-valued
//!   attributes;
//! - nested `<p begin="…" end="…">` / `<p t="…" d="…">` paragraphs with
//!   optional `<s>` spans, where `t`/`d` are milliseconds and `begin`/`end`
//!   accept clock timestamps or suffixed `Nms`/`Ns` forms.
//!
//! The XML reader unescapes entities; a second pass catches text that was
//! escaped twice at the source. All whitespace runs collapse to single
//! spaces.

use super::{collapse_whitespace, parse_timestamp, ParseOutcome};
use crate::types::TranscriptSegment;
use xml::reader::{EventReader, XmlEvent};

/// Timing of the cue element currently being read.
struct OpenCue {
    element: String,
    start_seconds: f64,
    duration_seconds: f64,
    text: String,
}

pub fn parse(raw: &str) -> ParseOutcome {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if !trimmed.starts_with('<') {
        return ParseOutcome::NotApplicable;
    }

    let mut segments = Vec::new();
    let mut saw_cue = false;
    let mut bad_timing = false;
    let mut open: Option<OpenCue> = None;

    for event in EventReader::new(trimmed.as_bytes()) {
        match event {
            Ok(XmlEvent::StartElement {
                name, attributes, ..
            }) => {
                let local = name.local_name.as_str();
                if open.is_some() {
                    // Inline markup inside a cue (spans, line breaks).
                    if local == "br" {
                        if let Some(cue) = open.as_mut() {
                            cue.text.push(' ');
                        }
                    }
                    continue;
                }
                let attr = |key: &str| {
                    attributes
                        .iter()
                        .find(|a| a.name.local_name == key)
                        .map(|a| a.value.as_str())
                };
                match local {
                    "text" => {
                        saw_cue = true;
                        let start = attr("start").and_then(|v| v.trim().parse::<f64>().ok());
                        let dur = attr("dur").and_then(|v| v.trim().parse::<f64>().ok());
                        match start {
                            Some(start) if start >= 0.0 => {
                                open = Some(OpenCue {
                                    element: "text".to_string(),
                                    start_seconds: start,
                                    duration_seconds: dur.unwrap_or(0.0).max(0.0),
                                    text: String::new(),
                                });
                            }
                            _ => bad_timing = true,
                        }
                    }
                    "p" => {
                        saw_cue = true;
                        let timing = if let Some(t) = attr("t") {
                            let start = t.trim().parse::<f64>().ok().map(|v| v / 1000.0);
                            let dur = attr("d")
                                .and_then(|v| v.trim().parse::<f64>().ok())
                                .map(|v| v / 1000.0)
                                .unwrap_or(0.0);
                            start.map(|s| (s, dur))
                        } else {
                            let begin = attr("begin").and_then(parse_timestamp);
                            let end = attr("end").and_then(parse_timestamp);
                            match (begin, end) {
                                (Some(b), Some(e)) => Some((b, (e - b).max(0.0))),
                                (Some(b), None) => Some((b, 0.0)),
                                _ => None,
                            }
                        };
                        match timing {
                            Some((start, dur)) if start >= 0.0 => {
                                open = Some(OpenCue {
                                    element: "p".to_string(),
                                    start_seconds: start,
                                    duration_seconds: dur,
                                    text: String::new(),
                                });
                            }
                            _ => bad_timing = true,
                        }
                    }
                    _ => {}
                }
            }
            Ok(XmlEvent::Characters(chunk))
            | Ok(XmlEvent::CData(chunk))
            | Ok(XmlEvent::Whitespace(chunk)) => {
                if let Some(cue) = open.as_mut() {
                    cue.text.push_str(&chunk);
                }
            }
            Ok(XmlEvent::EndElement { name }) => {
                let closes = open
                    .as_ref()
                    .map(|cue| cue.element == name.local_name)
                    .unwrap_or(false);
                if closes {
                    // open is Some here by the check above
                    if let Some(cue) = open.take() {
                        let text = collapse_whitespace(&unescape_residual(&cue.text));
                        if let Some(segment) =
                            TranscriptSegment::new(&text, cue.start_seconds, cue.duration_seconds)
                        {
                            segments.push(segment);
                        }
                    }
                }
            }
            Err(_) => {
                // Not well-formed. If cue elements were already seen this is
                // a broken caption document, otherwise it was never ours.
                return if saw_cue {
                    ParseOutcome::Malformed
                } else {
                    ParseOutcome::NotApplicable
                };
            }
            _ => {}
        }
    }

    if !saw_cue {
        return ParseOutcome::NotApplicable;
    }
    if segments.is_empty() && bad_timing {
        return ParseOutcome::Malformed;
    }
    ParseOutcome::Parsed(segments)
}

/// Unescape entities that survive the XML reader because the source text
/// was escaped twice.
fn unescape_residual(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..end];
        let replacement = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match replacement {
            Some(ch) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
