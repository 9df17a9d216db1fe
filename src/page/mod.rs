//! Page-realm extractor.
//!
//! Runs inside the page's own script environment, where the platform's
//! internal configuration and session tokens are visible. Serves
//! `GET_TRANSCRIPT` / `GET_CONFIG` requests arriving over the realm bus:
//! the two-step primary protocol first, then the caption-track fallback
//! when the primary yields nothing.

pub mod bootstrap;
pub mod tracks;
pub mod transcript;

use crate::bus::MessageBus;
use crate::config::PipelineConfig;
use crate::error::ErrorKind;
use crate::identity::{self, ClientIdentityProfile};
use crate::parser::{self, ParseOutcome};
use crate::rpc::{Action, RealmMessage, ResponsePayload, StrategySource};
use crate::types::{CaptionTrackDescriptor, StrategyOutcome};
use crate::upstream::UpstreamClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of the page's internal configuration and tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// API key the page uses for its own internal calls.
    pub api_key: String,
    /// Live client version string of the hosting page.
    pub client_version: String,
    /// Page UI language tag.
    pub language: String,
}

/// The page environment as the extractor sees it.
///
/// Production implementations read the page's global configuration object
/// and initial bootstrap data; tests substitute fixtures.
pub trait PageContext: Send + Sync {
    /// Configuration snapshot, if the page exposes one.
    fn config(&self) -> Option<PageConfig>;

    /// Caption tracks embedded in the page's initial bootstrap data.
    /// Best-effort: possibly stale after in-page navigation.
    fn embedded_caption_tracks(&self) -> Vec<CaptionTrackDescriptor>;
}

/// Extractor service living in the page realm.
pub struct PageExtractor {
    upstream: Arc<dyn UpstreamClient>,
    context: Arc<dyn PageContext>,
    config: PipelineConfig,
}

impl PageExtractor {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        context: Arc<dyn PageContext>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            upstream,
            context,
            config,
        }
    }

    /// Subscribe to the bus and serve realm requests until it closes.
    ///
    /// The subscription is taken before the task starts, so requests posted
    /// immediately after spawning are not lost.
    pub fn spawn(self, bus: MessageBus) -> tokio::task::JoinHandle<()> {
        let rx = bus.subscribe();
        tokio::spawn(self.serve(bus, rx))
    }

    async fn serve(self, bus: MessageBus, mut rx: crate::bus::BusReceiver) {
        while let Some(body) = rx.recv().await {
            let Ok(RealmMessage::Request {
                correlation_id,
                action,
                video_id,
            }) = serde_json::from_value(body)
            else {
                continue;
            };
            let payload = self.handle(action, video_id.as_deref()).await;
            let response = RealmMessage::Response {
                correlation_id,
                payload,
            };
            match serde_json::to_value(&response) {
                Ok(value) => bus.post(value),
                Err(err) => warn!(error = %err, "failed to serialize response"),
            }
        }
    }

    async fn handle(&self, action: Action, video_id: Option<&str>) -> ResponsePayload {
        match action {
            Action::GetConfig => match self.context.config() {
                Some(config) => ResponsePayload {
                    config: Some(config),
                    ..Default::default()
                },
                None => ResponsePayload {
                    error: Some(ErrorKind::NoConfig.to_string()),
                    ..Default::default()
                },
            },
            Action::GetTranscript => {
                let Some(video_id) = video_id else {
                    return ResponsePayload {
                        error: Some(ErrorKind::NoIdentifier.to_string()),
                        ..Default::default()
                    };
                };
                let (outcome, source) = self.extract(video_id).await;
                let error = outcome.error().map(ToString::to_string);
                ResponsePayload {
                    items: outcome.into_items(),
                    error,
                    source,
                    config: None,
                }
            }
        }
    }

    /// Full upstream extraction: the two-step primary protocol, then the
    /// caption-track fallback when the primary yields nothing.
    pub async fn extract(&self, video_id: &str) -> (StrategyOutcome, Option<StrategySource>) {
        let Some(page) = self.context.config() else {
            return (StrategyOutcome::failure(ErrorKind::NoConfig), None);
        };
        let primary = self.primary(video_id, &page).await;
        if primary.is_success() {
            return (primary, Some(StrategySource::Primary));
        }
        debug!(error = ?primary.error(), "primary strategy empty, trying caption tracks");
        let fallback = self.caption_tracks(video_id, &page).await;
        (fallback, Some(StrategySource::CaptionTracks))
    }

    /// Primary strategy: token discovery, then the transcript-body endpoint
    /// once per identity profile until one yields segments.
    async fn primary(&self, video_id: &str, page: &PageConfig) -> StrategyOutcome {
        let token = match bootstrap::find_continuation_token(
            self.upstream.as_ref(),
            &self.config,
            page,
            video_id,
        )
        .await
        {
            Ok(Some(token)) => token,
            Ok(None) => return StrategyOutcome::failure(ErrorKind::NoContinuationToken),
            Err(err) => return StrategyOutcome::failure((&err).into()),
        };
        let segments = identity::rotate(|profile| {
            let token = token.clone();
            async move {
                transcript::fetch_body(
                    self.upstream.as_ref(),
                    &self.config,
                    page,
                    profile,
                    &token,
                )
                .await
            }
        })
        .await;
        match segments {
            Some(segments) => StrategyOutcome::success(segments),
            None => StrategyOutcome::failure(ErrorKind::EmptyUpstreamResponse),
        }
    }

    /// Caption-track fallback: resolve tracks, pick one, fetch candidate
    /// URLs in order, and run each body through the parser cascade.
    async fn caption_tracks(&self, video_id: &str, page: &PageConfig) -> StrategyOutcome {
        let mut tracks =
            tracks::resolve_tracks(self.upstream.as_ref(), &self.config, page, video_id)
                .await
                .unwrap_or_default();
        if tracks.is_empty() {
            tracks = self.context.embedded_caption_tracks();
            if !tracks.is_empty() {
                warn!("using page-embedded caption tracks (best effort, possibly stale)");
            }
        }
        let Some(track) = tracks::select_track(&tracks, &self.config.preferred_language) else {
            return StrategyOutcome::failure(ErrorKind::EmptyUpstreamResponse);
        };
        debug!(language = %track.language_code, "selected caption track");

        let mut saw_malformed = false;
        for url in track.candidate_urls() {
            let body = match self.upstream.get_text(&url).await {
                Ok(body) if !body.trim().is_empty() => body,
                Ok(_) => continue,
                Err(err) => {
                    debug!(error = %err, "candidate track fetch failed");
                    continue;
                }
            };
            match parser::parse_any(&body) {
                ParseOutcome::Parsed(items) if !items.is_empty() => {
                    return StrategyOutcome::success(items);
                }
                ParseOutcome::Malformed => saw_malformed = true,
                _ => {}
            }
        }
        StrategyOutcome::failure(if saw_malformed {
            ErrorKind::ParseFailure
        } else {
            ErrorKind::EmptyUpstreamResponse
        })
    }
}

/// Endpoint URL with the page's own API key attached.
pub(crate) fn endpoint_url(config: &PipelineConfig, page: &PageConfig, path: &str) -> String {
    format!(
        "{}/{}?key={}&prettyPrint=false",
        config.api_base, path, page.api_key
    )
}

/// Identity headers accompanying an API call.
pub(crate) fn identity_headers(
    profile: &ClientIdentityProfile,
    version: &str,
) -> Vec<(String, String)> {
    vec![
        (
            "X-Youtube-Client-Name".to_string(),
            profile.client_header_id.to_string(),
        ),
        ("X-Youtube-Client-Version".to_string(), version.to_string()),
    ]
}

/// The client context block present in every API request body.
pub(crate) fn client_context(
    profile: &ClientIdentityProfile,
    version: &str,
    language: &str,
) -> Value {
    json!({
        "client": {
            "clientName": profile.name,
            "clientVersion": version,
            "hl": language,
        }
    })
}

/// The native profile rides the page's live version string; alternates use
/// their own pinned versions.
pub(crate) fn effective_version<'a>(
    profile: &'a ClientIdentityProfile,
    page: &'a PageConfig,
) -> &'a str {
    if profile.name == "WEB" && !page.client_version.is_empty() {
        &page.client_version
    } else {
        profile.client_version
    }
}
