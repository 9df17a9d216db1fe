//! Continuation-token discovery against the bootstrap endpoint.
//!
//! The structured response is walked for the transcript-fetch continuation;
//! if the walk comes up empty (the nesting moves around between page
//! versions), a raw pattern scan over the serialized body looks for the
//! same token shape.

use super::{client_context, effective_version, endpoint_url, identity_headers, PageConfig};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::identity::PROFILES;
use crate::upstream::UpstreamClient;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

/// Call the bootstrap endpoint for `video_id` and scan for the transcript
/// continuation token. `Ok(None)` means the call worked but no token was
/// found by either scan.
pub async fn find_continuation_token(
    upstream: &dyn UpstreamClient,
    config: &PipelineConfig,
    page: &PageConfig,
    video_id: &str,
) -> Result<Option<String>, FetchError> {
    let profile = &PROFILES[0];
    let version = effective_version(profile, page);
    let body = json!({
        "context": client_context(profile, version, &page.language),
        "videoId": video_id,
    });
    let response = upstream
        .post_json(
            &endpoint_url(config, page, "next"),
            &identity_headers(profile, version),
            body,
        )
        .await?;

    if let Some(token) = token_from_value(&response) {
        return Ok(Some(token));
    }
    debug!("structured token lookup failed, scanning raw body");
    Ok(token_from_raw(&response.to_string()))
}

/// Structured walk: the first `getTranscriptEndpoint` object with a string
/// `params` field, anywhere in the tree.
pub(crate) fn token_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(endpoint) = map.get("getTranscriptEndpoint") {
                if let Some(params) = endpoint.get("params").and_then(Value::as_str) {
                    if !params.is_empty() {
                        return Some(params.to_string());
                    }
                }
            }
            map.values().find_map(token_from_value)
        }
        Value::Array(items) => items.iter().find_map(token_from_value),
        _ => None,
    }
}

/// Raw fallback scan for the same token shape.
pub(crate) fn token_from_raw(raw: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(r#""getTranscriptEndpoint"\s*:\s*\{[^}]*"params"\s*:\s*"([^"]+)""#).ok()
        })
        .as_ref()?;
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}
