//! Caption-track resolution and selection.

use super::{client_context, effective_version, endpoint_url, identity_headers, PageConfig};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::identity::{self, ClientIdentityProfile};
use crate::types::CaptionTrackDescriptor;
use crate::upstream::UpstreamClient;
use serde_json::{json, Value};

/// Resolve the caption tracks for `video_id` from the player-metadata
/// endpoint, rotating identity profiles. `None` when no profile produced a
/// non-empty track list.
pub async fn resolve_tracks(
    upstream: &dyn UpstreamClient,
    config: &PipelineConfig,
    page: &PageConfig,
    video_id: &str,
) -> Option<Vec<CaptionTrackDescriptor>> {
    identity::rotate(|profile| fetch_tracks(upstream, config, page, profile, video_id)).await
}

async fn fetch_tracks(
    upstream: &dyn UpstreamClient,
    config: &PipelineConfig,
    page: &PageConfig,
    profile: &ClientIdentityProfile,
    video_id: &str,
) -> Result<Option<Vec<CaptionTrackDescriptor>>, FetchError> {
    let version = effective_version(profile, page);
    let body = json!({
        "context": client_context(profile, version, &page.language),
        "videoId": video_id,
    });
    let response = upstream
        .post_json(
            &endpoint_url(config, page, "player"),
            &identity_headers(profile, version),
            body,
        )
        .await?;
    let tracks = tracks_from_response(&response);
    Ok((!tracks.is_empty()).then_some(tracks))
}

/// Pull `captionTracks` descriptors out of a player-metadata response.
pub(crate) fn tracks_from_response(response: &Value) -> Vec<CaptionTrackDescriptor> {
    response
        .get("captions")
        .and_then(|captions| captions.get("playerCaptionsTracklistRenderer"))
        .and_then(|renderer| renderer.get("captionTracks"))
        .and_then(Value::as_array)
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|track| {
                    let base_url = track.get("baseUrl").and_then(Value::as_str)?;
                    let language_code = track
                        .get("languageCode")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Some(CaptionTrackDescriptor {
                        base_url: base_url.to_string(),
                        language_code: language_code.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pick the track for a preferred language tag: exact match first, then a
/// primary-subtag prefix match (`en` accepts `en-US`), else the first
/// available track.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrackDescriptor],
    preferred: &str,
) -> Option<&'a CaptionTrackDescriptor> {
    let preferred = preferred.to_ascii_lowercase();
    let primary = preferred.split('-').next().unwrap_or(&preferred);
    tracks
        .iter()
        .find(|track| track.language_code.eq_ignore_ascii_case(&preferred))
        .or_else(|| {
            tracks.iter().find(|track| {
                track
                    .language_code
                    .to_ascii_lowercase()
                    .split('-')
                    .next()
                    .map(|subtag| subtag == primary)
                    .unwrap_or(false)
            })
        })
        .or_else(|| tracks.first())
}
