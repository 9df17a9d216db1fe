//! Subtitle format parsers.
//!
//! Pure functions from a raw caption body to a normalized segment list,
//! tried in a fixed cascade: structured JSON events, timed XML dialects,
//! then WebVTT cue sheets. Each parser distinguishes "this is not my
//! format" from "this is my format but broken", so the cascade can move on
//! without conflating the two.

pub mod json_events;
pub mod timed_xml;
pub mod vtt;

use crate::types::TranscriptSegment;
use tracing::debug;

/// Result of applying one parser to a raw body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The body is not in this parser's format; the cascade should try the
    /// next one.
    NotApplicable,
    /// The body matched the format but could not be parsed.
    Malformed,
    /// Parsed segments; may be empty for a valid body with no cues.
    Parsed(Vec<TranscriptSegment>),
}

type ParserFn = fn(&str) -> ParseOutcome;

/// Fixed cascade order. Adding a format is a pure addition here.
const CASCADE: &[(&str, ParserFn)] = &[
    ("json-events", json_events::parse),
    ("timed-xml", timed_xml::parse),
    ("vtt", vtt::parse),
];

/// Run the raw body through every parser in order.
///
/// The first parser returning at least one segment wins. A valid-but-empty
/// parse does not stop the cascade. If nothing wins, the overall outcome is
/// `Malformed` when any parser recognized the format but failed on it, and
/// `NotApplicable` otherwise.
pub fn parse_any(raw: &str) -> ParseOutcome {
    let mut malformed = false;
    for (name, parser) in CASCADE {
        match parser(raw) {
            ParseOutcome::Parsed(items) if !items.is_empty() => {
                debug!(parser = name, segments = items.len(), "caption body parsed");
                return ParseOutcome::Parsed(items);
            }
            ParseOutcome::Parsed(_) => {
                debug!(parser = name, "body valid but empty");
            }
            ParseOutcome::Malformed => {
                debug!(parser = name, "format matched but body malformed");
                malformed = true;
            }
            ParseOutcome::NotApplicable => {}
        }
    }
    if malformed {
        ParseOutcome::Malformed
    } else {
        ParseOutcome::NotApplicable
    }
}

/// Parse a caption timestamp into seconds.
///
/// Accepts `hh:mm:ss.mmm`, `mm:ss.mmm`, bare seconds, and the suffixed
/// `Nms` / `Ns` forms found in timed-XML attributes.
pub(crate) fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(ms) = raw.strip_suffix("ms") {
        return ms.trim().parse::<f64>().ok().map(|v| v / 1000.0);
    }
    if let Some(secs) = raw.strip_suffix('s') {
        return secs.trim().parse::<f64>().ok();
    }
    let parts: Vec<&str> = raw.split(':').collect();
    let seconds = match parts.as_slice() {
        [h, m, s] => {
            let h: f64 = h.parse().ok()?;
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.replace(',', ".").parse().ok()?;
            h * 3600.0 + m * 60.0 + s
        }
        [m, s] => {
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.replace(',', ".").parse().ok()?;
            m * 60.0 + s
        }
        [s] => s.parse().ok()?,
        _ => return None,
    };
    (seconds >= 0.0).then_some(seconds)
}

/// Collapse all whitespace runs to single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
