//! Transcript-body fetch and segment-renderer parsing.

use super::{client_context, effective_version, endpoint_url, identity_headers, PageConfig};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::identity::ClientIdentityProfile;
use crate::types::TranscriptSegment;
use crate::upstream::UpstreamClient;
use serde_json::{json, Value};

/// Fetch the transcript body for one continuation token under one identity
/// profile. `Ok(None)` means the call worked but carried no segments, so
/// the rotator can try the next profile.
pub async fn fetch_body(
    upstream: &dyn UpstreamClient,
    config: &PipelineConfig,
    page: &PageConfig,
    profile: &ClientIdentityProfile,
    token: &str,
) -> Result<Option<Vec<TranscriptSegment>>, FetchError> {
    let version = effective_version(profile, page);
    let body = json!({
        "context": client_context(profile, version, &page.language),
        "params": token,
    });
    let response = upstream
        .post_json(
            &endpoint_url(config, page, "get_transcript"),
            &identity_headers(profile, version),
            body,
        )
        .await?;
    let segments = segments_from_response(&response);
    Ok((!segments.is_empty()).then_some(segments))
}

/// Collect every `transcriptSegmentRenderer` record in the response, in
/// document order. Records missing text runs are skipped, not fatal.
pub(crate) fn segments_from_response(value: &Value) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    collect(value, &mut segments);
    segments
}

fn collect(value: &Value, out: &mut Vec<TranscriptSegment>) {
    match value {
        Value::Object(map) => {
            if let Some(renderer) = map.get("transcriptSegmentRenderer") {
                if let Some(segment) = renderer_to_segment(renderer) {
                    out.push(segment);
                }
                return;
            }
            for child in map.values() {
                collect(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, out);
            }
        }
        _ => {}
    }
}

fn renderer_to_segment(renderer: &Value) -> Option<TranscriptSegment> {
    let text: String = renderer
        .get("snippet")?
        .get("runs")?
        .as_array()?
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect();
    let start_ms = renderer.get("startMs").and_then(ms_value)?;
    let end_ms = renderer.get("endMs").and_then(ms_value).unwrap_or(start_ms);
    TranscriptSegment::new(
        &text,
        start_ms / 1000.0,
        ((end_ms - start_ms) / 1000.0).max(0.0),
    )
}

/// Millisecond fields arrive as strings or numbers depending on client.
fn ms_value(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_renderers_collected_in_order() {
        let response: Value = serde_json::from_str(
            r#"{"actions":[{"updateAction":{"content":{"body":{"initialSegments":[
                {"transcriptSegmentRenderer":{"startMs":"0","endMs":"1200",
                    "snippet":{"runs":[{"text":"first"}]}}},
                {"transcriptSegmentRenderer":{"startMs":"1200","endMs":"2000",
                    "snippet":{"runs":[{"text":"sec"},{"text":"ond"}]}}}
            ]}}}}]}"#,
        )
        .unwrap();
        let segments = segments_from_response(&response);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first");
        assert_eq!(segments[1].text, "second");
        assert!((segments[0].duration_seconds - 1.2).abs() < 1e-9);
        assert!((segments[1].start_seconds - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_ms_fields_accepted() {
        let response: Value = serde_json::from_str(
            r#"{"transcriptSegmentRenderer":{"startMs":500,"endMs":900,
                "snippet":{"runs":[{"text":"hi"}]}}}"#,
        )
        .unwrap();
        let segments = segments_from_response(&response);
        assert!((segments[0].start_seconds - 0.5).abs() < 1e-9);
        assert!((segments[0].duration_seconds - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_renderer_without_runs_skipped() {
        let response: Value = serde_json::from_str(
            r#"{"a":[{"transcriptSegmentRenderer":{"startMs":"0"}},
                 {"transcriptSegmentRenderer":{"startMs":"100","endMs":"200",
                    "snippet":{"runs":[{"text":"ok"}]}}}]}"#,
        )
        .unwrap();
        let segments = segments_from_response(&response);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ok");
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        assert!(segments_from_response(&serde_json::json!({})).is_empty());
    }
}
