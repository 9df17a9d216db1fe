//! Core data model shared by both realms.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// One timed unit of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Text content, non-empty and trimmed.
    pub text: String,
    /// Start offset from the beginning of the video, in seconds.
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    /// Build a segment from raw parts, trimming the text.
    ///
    /// Returns `None` for whitespace-only text or negative timing, so
    /// parsers can filter as they collect.
    pub fn new(text: &str, start_seconds: f64, duration_seconds: f64) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || start_seconds < 0.0 || duration_seconds < 0.0 {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            start_seconds,
            duration_seconds,
        })
    }
}

/// One extraction attempt, issued across the realm boundary.
///
/// Correlation ids are unique per request and never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub video_id: String,
    pub correlation_id: String,
}

impl ExtractionRequest {
    /// Fresh request with a unique correlation id.
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// A caption track advertised by the platform for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrackDescriptor {
    /// URL of the track in its native serialization.
    pub base_url: String,
    /// BCP-47-ish language tag, e.g. `en` or `en-US`.
    pub language_code: String,
}

impl CaptionTrackDescriptor {
    /// Candidate fetch URLs for this track: the native URL first, then
    /// explicit format overrides, tried strictly in order.
    pub fn candidate_urls(&self) -> Vec<String> {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        let mut urls = vec![self.base_url.clone()];
        for fmt in ["json3", "srv1", "vtt"] {
            urls.push(format!("{}{}fmt={}", self.base_url, sep, fmt));
        }
        urls
    }
}

/// Result of one extraction strategy.
///
/// Holds either a non-empty segment list or an error reason, never both.
/// The constructors enforce the invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    items: Option<Vec<TranscriptSegment>>,
    error: Option<ErrorKind>,
}

impl StrategyOutcome {
    /// A successful outcome. An empty segment list is downgraded to
    /// [`ErrorKind::EmptyUpstreamResponse`] so "success" always means
    /// at least one segment.
    pub fn success(items: Vec<TranscriptSegment>) -> Self {
        if items.is_empty() {
            return Self::failure(ErrorKind::EmptyUpstreamResponse);
        }
        Self {
            items: Some(items),
            error: None,
        }
    }

    /// A failed outcome with a typed reason.
    pub fn failure(error: ErrorKind) -> Self {
        Self {
            items: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.items.is_some()
    }

    pub fn items(&self) -> Option<&[TranscriptSegment]> {
        self.items.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        self.error.as_ref()
    }

    pub fn into_items(self) -> Option<Vec<TranscriptSegment>> {
        self.items
    }
}
