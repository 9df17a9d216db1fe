//! Rendered caption-panel scraping, the last-resort strategy.
//!
//! When every upstream call fails, the DOM realm reads the transcript panel
//! the page can render for its users. Scraped segments carry zero timings:
//! the panel exposes no machine timing, and fabricating one would be worse
//! than none.

use crate::config::PipelineConfig;
use crate::error::ErrorKind;
use crate::poll::poll_until;
use crate::types::{StrategyOutcome, TranscriptSegment};
use async_trait::async_trait;
use tracing::debug;

/// Label phrases matched (case-insensitive, substring) against interactive
/// elements to find the panel-opening affordance.
const PANEL_LABELS: &[&str] = &["show transcript", "open transcript", "transcript"];

/// Opaque handle to an interactive element on the rendered page.
pub type ElementHandle = u64;

/// The rendered page as the scraper sees it.
#[async_trait]
pub trait CaptionSurface: Send + Sync {
    /// Text of each rendered caption segment node; empty when the panel is
    /// closed or still loading.
    async fn panel_segment_texts(&self) -> Vec<String>;

    /// Find an interactive element whose accessible label contains `label`
    /// (case-insensitive).
    async fn find_labeled(&self, label: &str) -> Option<ElementHandle>;

    /// Activate an element.
    async fn click(&self, handle: ElementHandle);

    /// Open the secondary "more actions" menu. `true` if one was found and
    /// opened.
    async fn open_more_menu(&self) -> bool;
}

/// Scrape the caption panel, opening it first if needed.
pub async fn scrape(surface: &dyn CaptionSurface, config: &PipelineConfig) -> StrategyOutcome {
    let texts = surface.panel_segment_texts().await;
    if !texts.is_empty() {
        debug!(nodes = texts.len(), "caption panel already rendered");
        return segments_from(texts);
    }

    let mut affordance = find_affordance(surface).await;
    if affordance.is_none() && surface.open_more_menu().await {
        affordance = find_affordance(surface).await;
    }
    let Some(handle) = affordance else {
        debug!("no caption-panel affordance found");
        return StrategyOutcome::failure(ErrorKind::EmptyUpstreamResponse);
    };

    surface.click(handle).await;
    let texts = poll_until(config.poll_interval(), config.poll_max_attempts, || async move {
        let texts = surface.panel_segment_texts().await;
        (!texts.is_empty()).then_some(texts)
    })
    .await;
    match texts {
        Some(texts) => segments_from(texts),
        None => StrategyOutcome::failure(ErrorKind::Timeout),
    }
}

async fn find_affordance(surface: &dyn CaptionSurface) -> Option<ElementHandle> {
    for label in PANEL_LABELS {
        if let Some(handle) = surface.find_labeled(label).await {
            debug!(label, "found caption-panel affordance");
            return Some(handle);
        }
    }
    None
}

/// Scraped nodes carry no timing information; zero timings are deliberate.
fn segments_from(texts: Vec<String>) -> StrategyOutcome {
    let items: Vec<TranscriptSegment> = texts
        .iter()
        .filter_map(|text| TranscriptSegment::new(text, 0.0, 0.0))
        .collect();
    StrategyOutcome::success(items)
}
