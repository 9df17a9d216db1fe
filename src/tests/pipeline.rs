//! Whole-pipeline scenarios: both realms wired over a real bus, scripted
//! upstream and page collaborators.

use super::fixtures::{init_tracing, FixtureContext, InertSurface, RecordingRelay, ScriptedUpstream};
use crate::bus::MessageBus;
use crate::config::PipelineConfig;
use crate::orchestrator::{ChainResult, ChainState, Orchestrator, Strategy};
use crate::page::{PageContext, PageExtractor};
use crate::relay::DeliveryRelay;
use crate::rpc::RpcChannel;
use crate::scrape::{CaptionSurface, ElementHandle};
use crate::types::CaptionTrackDescriptor;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

fn bootstrap_with_token() -> serde_json::Value {
    json!({"contents":{"panels":[
        {"content":{"getTranscriptEndpoint":{"params":"tok-1"}}}
    ]}})
}

fn transcript_response() -> serde_json::Value {
    json!({"actions":[{"segments":[
        {"transcriptSegmentRenderer":{"startMs":"0","endMs":"2000",
            "snippet":{"runs":[{"text":"the first half of a reasonably long caption"}]}}},
        {"transcriptSegmentRenderer":{"startMs":"2000","endMs":"4000",
            "snippet":{"runs":[{"text":"and the second half of it"}]}}}
    ]}]})
}

fn wire(
    upstream: Arc<ScriptedUpstream>,
    context: Arc<dyn PageContext>,
    surface: Arc<dyn CaptionSurface>,
    relay: Arc<dyn DeliveryRelay>,
) -> Orchestrator {
    let config = PipelineConfig::default();
    let bus = MessageBus::new("page");
    PageExtractor::new(upstream, context, config.clone()).spawn(bus.clone());
    let rpc = RpcChannel::new(bus, config.rpc_timeout());
    Orchestrator::new(rpc, surface, relay, config)
}

#[tokio::test(start_paused = true)]
async fn test_primary_success_short_circuits_later_strategies() {
    init_tracing();
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .route_json("/next", bootstrap_with_token())
            .route_json("/get_transcript", transcript_response()),
    );
    let surface = Arc::new(InertSurface::default());
    let relay = Arc::new(RecordingRelay::default());
    let mut orchestrator = wire(
        Arc::clone(&upstream),
        Arc::new(FixtureContext::configured()),
        surface.clone() as Arc<dyn CaptionSurface>,
        relay.clone() as Arc<dyn DeliveryRelay>,
    );

    orchestrator.on_navigate("vid-1");
    let delivery = orchestrator.extract().await;

    assert!(delivery.sufficient);
    assert!(delivery.transcript.starts_with("the first half"));
    assert_eq!(delivery.segments.len(), 2);

    // Later strategies never ran.
    assert!(!upstream.called("/player"));
    assert!(!*surface.touched.lock());
    let session = orchestrator.session().unwrap();
    assert_eq!(session.state(), ChainState::Done(ChainResult::Success));
    let expected: std::collections::HashSet<Strategy> =
        [Strategy::UpstreamPrimary].into_iter().collect();
    assert_eq!(session.attempted, expected);
    assert_eq!(relay.deliveries.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_caption_track_fallback_parses_vtt() {
    let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nthe first half of a reasonably long caption\n\n00:00:04.000 --> 00:00:05.000\nand the second half of it\n";
    let upstream = Arc::new(
        ScriptedUpstream::new()
            // Bootstrap works but carries no transcript continuation.
            .route_json("/next", json!({"contents":{}}))
            .route_json(
                "/player",
                json!({"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
                    {"baseUrl":"https://host/track/de","languageCode":"de"},
                    {"baseUrl":"https://host/track/en","languageCode":"en"}
                ]}}}),
            )
            .route_text("track/en", vtt),
    );
    let surface = Arc::new(InertSurface::default());
    let mut orchestrator = wire(
        Arc::clone(&upstream),
        Arc::new(FixtureContext::configured()),
        surface.clone() as Arc<dyn CaptionSurface>,
        Arc::new(RecordingRelay::default()),
    );

    orchestrator.on_navigate("vid-2");
    let delivery = orchestrator.extract().await;

    assert!(delivery.sufficient);
    assert_eq!(delivery.segments[0].text, "the first half of a reasonably long caption");
    assert!((delivery.segments[0].start_seconds - 1.0).abs() < 1e-9);
    assert!(!*surface.touched.lock());
    let session = orchestrator.session().unwrap();
    assert_eq!(session.state(), ChainState::Done(ChainResult::Success));
    assert!(session.attempted.contains(&Strategy::UpstreamCaptionTracks));
}

#[tokio::test(start_paused = true)]
async fn test_embedded_tracks_back_up_empty_player_metadata() {
    let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nthe first half of a reasonably long caption\n\n00:00:04.000 --> 00:00:05.000\nand the second half of it\n";
    // No transcript continuation and no tracks from the metadata endpoint;
    // only the page-embedded descriptor reaches the caption body.
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .route_json("/next", json!({"contents":{}}))
            .route_text("embedded/en", vtt),
    );
    let context = Arc::new(FixtureContext::configured().with_embedded(vec![
        CaptionTrackDescriptor {
            base_url: "https://host/embedded/en".to_string(),
            language_code: "en".to_string(),
        },
    ]));
    let surface = Arc::new(InertSurface::default());
    let mut orchestrator = wire(
        Arc::clone(&upstream),
        context,
        surface.clone() as Arc<dyn CaptionSurface>,
        Arc::new(RecordingRelay::default()),
    );

    orchestrator.on_navigate("vid-9");
    let delivery = orchestrator.extract().await;

    assert!(delivery.sufficient);
    assert_eq!(delivery.segments.len(), 2);
    // The metadata endpoint was asked and came up empty first.
    assert!(upstream.called("/player"));
    assert!(!*surface.touched.lock());
    let session = orchestrator.session().unwrap();
    assert_eq!(session.state(), ChainState::Done(ChainResult::Success));
    assert!(session.attempted.contains(&Strategy::UpstreamCaptionTracks));
}

#[tokio::test(start_paused = true)]
async fn test_all_strategies_exhausted_reaches_done_empty() {
    init_tracing();
    // Upstream answers every call with empty bodies; the surface has no
    // panel and no affordance.
    let upstream = Arc::new(ScriptedUpstream::new());
    let surface = Arc::new(InertSurface::default());
    let relay = Arc::new(RecordingRelay::default());
    let mut orchestrator = wire(
        Arc::clone(&upstream),
        Arc::new(FixtureContext::configured()),
        surface.clone() as Arc<dyn CaptionSurface>,
        relay.clone() as Arc<dyn DeliveryRelay>,
    );

    orchestrator.on_navigate("vid-3");
    let delivery = orchestrator.extract().await;

    assert!(!delivery.sufficient);
    assert!(delivery.transcript.is_empty());
    let session = orchestrator.session().unwrap();
    assert_eq!(session.state(), ChainState::Done(ChainResult::Empty));
    assert_eq!(session.attempted.len(), 3);
    assert!(*surface.touched.lock());
    // The (insufficient) result is still handed over exactly once.
    assert_eq!(relay.deliveries.lock().len(), 1);
}

/// Surface with an already-rendered caption panel.
struct OpenPanelSurface;

#[async_trait]
impl CaptionSurface for OpenPanelSurface {
    async fn panel_segment_texts(&self) -> Vec<String> {
        vec![
            "the first half of a reasonably long caption".to_string(),
            "and the second half of it".to_string(),
        ]
    }

    async fn find_labeled(&self, _label: &str) -> Option<ElementHandle> {
        None
    }

    async fn click(&self, _handle: ElementHandle) {}

    async fn open_more_menu(&self) -> bool {
        false
    }
}

#[tokio::test(start_paused = true)]
async fn test_scrape_fallback_yields_zero_timings() {
    let upstream = Arc::new(ScriptedUpstream::new());
    let mut orchestrator = wire(
        upstream,
        Arc::new(FixtureContext::configured()),
        Arc::new(OpenPanelSurface),
        Arc::new(RecordingRelay::default()),
    );

    orchestrator.on_navigate("vid-4");
    let delivery = orchestrator.extract().await;

    assert!(delivery.sufficient);
    assert!(delivery
        .segments
        .iter()
        .all(|s| s.start_seconds == 0.0 && s.duration_seconds == 0.0));
    let session = orchestrator.session().unwrap();
    assert_eq!(session.state(), ChainState::Done(ChainResult::Success));
    assert!(session.attempted.contains(&Strategy::DomScrape));
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_page_still_degrades_cleanly() {
    let upstream = Arc::new(ScriptedUpstream::new());
    let context = Arc::new(FixtureContext {
        config: None,
        embedded: Vec::new(),
    });
    let mut orchestrator = wire(
        Arc::clone(&upstream),
        context,
        Arc::new(InertSurface::default()),
        Arc::new(RecordingRelay::default()),
    );

    assert!(!orchestrator.page_ready().await);
    orchestrator.on_navigate("vid-5");
    let delivery = orchestrator.extract().await;
    assert!(!delivery.sufficient);
    // No upstream call is even possible without page config.
    assert!(upstream.calls.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offer_once_per_view_and_reset_on_navigation() {
    let mut orchestrator = wire(
        Arc::new(ScriptedUpstream::new()),
        Arc::new(FixtureContext::configured()),
        Arc::new(InertSurface::default()),
        Arc::new(RecordingRelay::default()),
    );

    assert!(!orchestrator.should_offer());
    orchestrator.on_navigate("vid-6");
    assert!(orchestrator.should_offer());
    assert!(!orchestrator.should_offer());

    orchestrator.on_navigate("vid-7");
    assert!(orchestrator.should_offer());

    // Returning to a previously seen video is a new view.
    orchestrator.on_navigate("vid-6");
    assert!(orchestrator.should_offer());
}

#[tokio::test(start_paused = true)]
async fn test_chain_runs_once_per_session() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .route_json("/next", bootstrap_with_token())
            .route_json("/get_transcript", transcript_response()),
    );
    let relay = Arc::new(RecordingRelay::default());
    let mut orchestrator = wire(
        upstream,
        Arc::new(FixtureContext::configured()),
        Arc::new(InertSurface::default()),
        relay.clone() as Arc<dyn DeliveryRelay>,
    );

    orchestrator.on_navigate("vid-8");
    let first = orchestrator.extract().await;
    assert!(first.sufficient);
    // Without a navigation, a second run refuses to re-enter the chain.
    let second = orchestrator.extract().await;
    assert!(!second.sufficient);
    assert_eq!(relay.deliveries.lock().len(), 1);

    orchestrator.on_navigate("vid-8");
    let third = orchestrator.extract().await;
    assert!(third.sufficient);
}
