//! DOM-realm orchestrator.
//!
//! Drives the strategy chain for one video view: upstream extraction via
//! the cross-realm RPC (primary protocol, then caption tracks, both served
//! in the page realm), then panel scraping as last resort, then hand-off to
//! the delivery relay. Transitions are forward-only; no strategy is retried
//! within one session.

use crate::config::PipelineConfig;
use crate::relay::{deliver_with_ack, DeliveryRelay, TranscriptDelivery};
use crate::rpc::{Action, RpcChannel, StrategySource};
use crate::scrape::{self, CaptionSurface, ElementHandle};
use crate::types::TranscriptSegment;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One extraction method in the fixed chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    UpstreamPrimary,
    UpstreamCaptionTracks,
    DomScrape,
}

/// Terminal result of a chain run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainResult {
    Success,
    Empty,
}

/// Strategy-chain states. Transitions only move forward; a fresh session
/// restarts from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Idle,
    TryPrimary,
    TryCaptionFallback,
    TryDomScrape,
    Done(ChainResult),
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainState::Idle => write!(f, "idle"),
            ChainState::TryPrimary => write!(f, "try-primary"),
            ChainState::TryCaptionFallback => write!(f, "try-caption-fallback"),
            ChainState::TryDomScrape => write!(f, "try-dom-scrape"),
            ChainState::Done(ChainResult::Success) => write!(f, "done(success)"),
            ChainState::Done(ChainResult::Empty) => write!(f, "done(empty)"),
        }
    }
}

/// Per-video-view extraction state. Created on navigation, discarded on the
/// next navigation, never shared across videos.
#[derive(Debug)]
pub struct ExtractionSession {
    pub video_id: String,
    /// Strategies attempted so far; the forward-only rule means no strategy
    /// appears here twice.
    pub attempted: HashSet<Strategy>,
    /// Handle of the UI affordance inserted for this view, if any.
    pub ui_handle: Option<ElementHandle>,
    state: ChainState,
}

impl ExtractionSession {
    pub fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            attempted: HashSet::new(),
            ui_handle: None,
            state: ChainState::Idle,
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    fn advance(&mut self, next: ChainState) {
        debug!(video_id = %self.video_id, from = %self.state, to = %next, "chain transition");
        self.state = next;
    }
}

/// Orchestrator living in the DOM realm.
pub struct Orchestrator {
    rpc: RpcChannel,
    surface: Arc<dyn CaptionSurface>,
    relay: Arc<dyn DeliveryRelay>,
    config: PipelineConfig,
    session: Option<ExtractionSession>,
    /// Whether extraction has been offered for the current view of a video.
    /// Retained across sessions, invalidated per video on navigation.
    offered: HashMap<String, bool>,
}

impl Orchestrator {
    pub fn new(
        rpc: RpcChannel,
        surface: Arc<dyn CaptionSurface>,
        relay: Arc<dyn DeliveryRelay>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            rpc,
            surface,
            relay,
            config,
            session: None,
            offered: HashMap::new(),
        }
    }

    /// Navigation to a (possibly different) video: discard the old session,
    /// start a fresh one, and invalidate the offered flag for the new view.
    pub fn on_navigate(&mut self, video_id: &str) {
        self.offered.remove(video_id);
        self.session = Some(ExtractionSession::new(video_id));
    }

    /// Whether the extraction affordance should be offered for the current
    /// view. Flips the flag: one view is offered exactly once.
    pub fn should_offer(&mut self) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        let offered = self
            .offered
            .entry(session.video_id.clone())
            .or_insert(false);
        !std::mem::replace(offered, true)
    }

    /// Check the page realm is alive and configured before offering.
    pub async fn page_ready(&self) -> bool {
        self.rpc
            .call(Action::GetConfig, None)
            .await
            .map(|payload| payload.config.is_some())
            .unwrap_or(false)
    }

    pub fn session(&self) -> Option<&ExtractionSession> {
        self.session.as_ref()
    }

    /// Run the strategy chain for the current session and hand the outcome
    /// to the delivery relay. Never fails: the worst case is an
    /// insufficient, empty delivery.
    pub async fn extract(&mut self) -> TranscriptDelivery {
        let Some(mut session) = self.session.take() else {
            warn!("extraction requested without a session");
            return TranscriptDelivery::from_segments(Vec::new(), self.config.min_transcript_chars);
        };
        if session.state() != ChainState::Idle {
            // Forward-only: a session's chain runs once. Retrying means a
            // new session via navigation.
            warn!(video_id = %session.video_id, state = %session.state(), "chain already ran for this session");
            self.session = Some(session);
            return TranscriptDelivery::from_segments(Vec::new(), self.config.min_transcript_chars);
        }
        let items = self.run_chain(&mut session).await;
        let delivery = TranscriptDelivery::from_segments(
            items.unwrap_or_default(),
            self.config.min_transcript_chars,
        );
        deliver_with_ack(
            self.relay.as_ref(),
            &delivery,
            self.config.max_delivery_attempts,
            self.config.delivery_retry(),
        )
        .await;
        self.session = Some(session);
        delivery
    }

    async fn run_chain(&self, session: &mut ExtractionSession) -> Option<Vec<TranscriptSegment>> {
        let video_id = session.video_id.clone();
        info!(%video_id, "starting extraction chain");

        // Both upstream strategies run page-side within one RPC round-trip;
        // the payload reports which one produced the result.
        session.advance(ChainState::TryPrimary);
        session.attempted.insert(Strategy::UpstreamPrimary);
        let response = self
            .rpc
            .call(Action::GetTranscript, Some(video_id.clone()))
            .await;

        let mut items: Option<Vec<TranscriptSegment>> = None;
        match response {
            Some(payload) => {
                if payload.source == Some(StrategySource::CaptionTracks) {
                    session.advance(ChainState::TryCaptionFallback);
                    session.attempted.insert(Strategy::UpstreamCaptionTracks);
                }
                if let Some(error) = payload.error.as_deref() {
                    debug!(%video_id, error, "upstream extraction reported an error");
                }
                items = payload.items.filter(|segments| !segments.is_empty());
            }
            None => {
                // Timed out or unanswerable; the page realm exhausted (or
                // never reached) both upstream strategies.
                session.advance(ChainState::TryCaptionFallback);
                session.attempted.insert(Strategy::UpstreamCaptionTracks);
                debug!(%video_id, "upstream extraction yielded no response");
            }
        }

        if items.is_none() {
            session.advance(ChainState::TryDomScrape);
            session.attempted.insert(Strategy::DomScrape);
            let outcome = scrape::scrape(self.surface.as_ref(), &self.config).await;
            if let Some(error) = outcome.error() {
                debug!(%video_id, %error, "panel scrape failed");
            }
            items = outcome.into_items();
        }

        match items {
            Some(segments) => {
                info!(%video_id, segments = segments.len(), "extraction succeeded");
                session.advance(ChainState::Done(ChainResult::Success));
                Some(segments)
            }
            None => {
                info!(%video_id, "extraction exhausted all strategies");
                session.advance(ChainState::Done(ChainResult::Empty));
                None
            }
        }
    }
}
