//! Cross-realm RPC over the shared message bus.
//!
//! Correlates a request issued in the DOM realm with a response produced in
//! the page realm. Each call registers a one-shot pending entry keyed on a
//! fresh correlation id; the entry is removed on response, timeout, or send
//! failure, so a slow response arriving after its timeout fired is dropped
//! instead of resolving a stale call.

use crate::bus::MessageBus;
use crate::page::PageConfig;
use crate::types::{ExtractionRequest, TranscriptSegment};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Actions the DOM realm can request from the page realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "GET_TRANSCRIPT")]
    GetTranscript,
    #[serde(rename = "GET_CONFIG")]
    GetConfig,
}

/// Which page-side strategy produced a transcript payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategySource {
    Primary,
    CaptionTracks,
}

/// Response body crossing the realm boundary.
///
/// `items` and `error` follow the wire schema; `source` and `config` are
/// additive fields the schema tolerates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub items: Option<Vec<TranscriptSegment>>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<StrategySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PageConfig>,
}

/// Wire schema for realm-to-realm messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RealmMessage {
    #[serde(rename = "REQUEST")]
    Request {
        #[serde(rename = "correlationId")]
        correlation_id: String,
        action: Action,
        #[serde(rename = "videoIdentifier", skip_serializing_if = "Option::is_none")]
        video_id: Option<String>,
    },
    #[serde(rename = "RESPONSE")]
    Response {
        #[serde(rename = "correlationId")]
        correlation_id: String,
        payload: ResponsePayload,
    },
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponsePayload>>>>;

/// Caller side of the channel.
///
/// Stateless apart from the pending-call map; safe to invoke repeatedly and
/// concurrently. At most one pending entry exists per correlation id.
#[derive(Clone)]
pub struct RpcChannel {
    bus: MessageBus,
    pending: PendingMap,
    timeout: Duration,
}

impl RpcChannel {
    /// Create the channel and spawn its response router.
    ///
    /// The router drains same-origin bus traffic, resolves pending calls by
    /// correlation id, and drops responses nobody is waiting for. It exits
    /// when the bus closes.
    pub fn new(bus: MessageBus, timeout: Duration) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let mut rx = bus.subscribe();
        let router_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(body) = rx.recv().await {
                let Ok(RealmMessage::Response {
                    correlation_id,
                    payload,
                }) = serde_json::from_value(body)
                else {
                    continue;
                };
                match router_pending.lock().remove(&correlation_id) {
                    Some(tx) => {
                        let _ = tx.send(payload);
                    }
                    None => {
                        debug!(%correlation_id, "dropping response for unknown correlation id");
                    }
                }
            }
        });
        Self {
            bus,
            pending,
            timeout,
        }
    }

    /// Issue one request and wait for its matching response.
    ///
    /// Resolves to `None` if no matching response arrives within the
    /// timeout; the caller is never left blocked.
    pub async fn call(&self, action: Action, video_id: Option<String>) -> Option<ResponsePayload> {
        // Transcript calls are each their own extraction request; other
        // actions just need a fresh correlation id.
        let (correlation_id, video_id) = match (action, video_id) {
            (Action::GetTranscript, Some(video_id)) => {
                let request = ExtractionRequest::new(&video_id);
                (request.correlation_id, Some(request.video_id))
            }
            (_, video_id) => (uuid::Uuid::new_v4().to_string(), video_id),
        };
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(correlation_id.clone(), tx);

        let request = RealmMessage::Request {
            correlation_id: correlation_id.clone(),
            action,
            video_id,
        };
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(err) => {
                debug!(error = %err, "failed to serialize request");
                self.pending.lock().remove(&correlation_id);
                return None;
            }
        };
        self.bus.post(body);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(payload)) => Some(payload),
            Ok(Err(_)) => {
                // Router dropped the sender (bus closed mid-call).
                self.pending.lock().remove(&correlation_id);
                None
            }
            Err(_) => {
                debug!(%correlation_id, ?action, "rpc call timed out");
                self.pending.lock().remove(&correlation_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_channel(timeout_ms: u64) -> (RpcChannel, MessageBus) {
        let bus = MessageBus::new("page");
        let channel = RpcChannel::new(bus.clone(), Duration::from_millis(timeout_ms));
        (channel, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out_to_none() {
        let (channel, _bus) = test_channel(10_000);
        // Nobody answers; paused time fast-forwards through the timeout.
        let result = channel.call(Action::GetTranscript, Some("vid".into())).await;
        assert!(result.is_none());
        assert!(channel.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_call_resolves_on_matching_response() {
        let (channel, bus) = test_channel(10_000);
        let responder_bus = bus.clone();
        // Subscribe before the call so the request is not lost.
        let mut rx = responder_bus.subscribe();
        tokio::spawn(async move {
            while let Some(body) = rx.recv().await {
                if let Ok(RealmMessage::Request { correlation_id, .. }) =
                    serde_json::from_value(body)
                {
                    let response = RealmMessage::Response {
                        correlation_id,
                        payload: ResponsePayload {
                            error: Some("no config".into()),
                            ..Default::default()
                        },
                    };
                    responder_bus.post(serde_json::to_value(&response).unwrap());
                }
            }
        });
        let payload = channel.call(Action::GetConfig, None).await.unwrap();
        assert_eq!(payload.error.as_deref(), Some("no config"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_correlation_id_discarded() {
        let (channel, bus) = test_channel(50);
        let responder_bus = bus.clone();
        let mut rx = responder_bus.subscribe();
        tokio::spawn(async move {
            while let Some(body) = rx.recv().await {
                if serde_json::from_value::<RealmMessage>(body.clone())
                    .map(|m| matches!(m, RealmMessage::Request { .. }))
                    .unwrap_or(false)
                {
                    // Answer with a correlation id that was never issued.
                    responder_bus.post(json!({
                        "type": "RESPONSE",
                        "correlationId": "not-a-pending-id",
                        "payload": { "items": null, "error": null },
                    }));
                }
            }
        });
        let result = channel.call(Action::GetTranscript, Some("vid".into())).await;
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_origin_response_ignored() {
        let bus = MessageBus::new("page");
        let channel = RpcChannel::new(bus.clone(), Duration::from_millis(50));
        let foreign = bus.with_origin("other-page");
        let responder = bus.clone();
        let mut rx = responder.subscribe();
        tokio::spawn(async move {
            while let Some(body) = rx.recv().await {
                if let Ok(RealmMessage::Request { correlation_id, .. }) =
                    serde_json::from_value(body)
                {
                    // A correct response, but posted from a foreign origin.
                    let response = RealmMessage::Response {
                        correlation_id,
                        payload: ResponsePayload::default(),
                    };
                    foreign.post(serde_json::to_value(&response).unwrap());
                }
            }
        });
        let result = channel.call(Action::GetTranscript, Some("vid".into())).await;
        assert!(result.is_none());
    }

    #[test]
    fn test_request_wire_shape() {
        let request = RealmMessage::Request {
            correlation_id: "c1".into(),
            action: Action::GetTranscript,
            video_id: Some("abc".into()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "REQUEST");
        assert_eq!(value["action"], "GET_TRANSCRIPT");
        assert_eq!(value["correlationId"], "c1");
        assert_eq!(value["videoIdentifier"], "abc");
    }
}
