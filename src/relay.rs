//! Delivery boundary toward the host application.

use crate::types::TranscriptSegment;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Final result handed to the host application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptDelivery {
    /// Space-joined concatenation of segment texts, in order.
    pub transcript: String,
    pub segments: Vec<TranscriptSegment>,
    /// Whether the transcript clears the minimum-length threshold. Callers
    /// must treat an insufficient result as absent, not partial.
    pub sufficient: bool,
}

impl TranscriptDelivery {
    pub fn from_segments(segments: Vec<TranscriptSegment>, min_chars: usize) -> Self {
        let transcript = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let sufficient = transcript.len() > min_chars;
        Self {
            transcript,
            segments,
            sufficient,
        }
    }
}

/// Destination side of the pipeline.
///
/// `deliver` returning `true` is the receipt acknowledgment; the sender
/// stops repeating once acknowledged (idempotent ack, not exactly-once).
#[async_trait]
pub trait DeliveryRelay: Send + Sync {
    async fn deliver(&self, delivery: &TranscriptDelivery) -> bool;
}

/// Repeat delivery until the destination acknowledges, bounded by
/// `max_attempts`. Returns whether an ack was received.
pub async fn deliver_with_ack(
    relay: &dyn DeliveryRelay,
    delivery: &TranscriptDelivery,
    max_attempts: u32,
    retry_interval: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        if relay.deliver(delivery).await {
            debug!(attempt, "delivery acknowledged");
            return true;
        }
        debug!(attempt, "delivery not acknowledged");
        if attempt < max_attempts {
            tokio::time::sleep(retry_interval).await;
        }
    }
    false
}
