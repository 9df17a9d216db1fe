//! Shared message bus connecting the two realms.
//!
//! Models same-page message passing: every handle posts onto one shared
//! channel and every subscriber, including the poster's own realm, receives
//! everything. Messages carry the origin tag of the posting context;
//! receivers drop anything not posted from their own origin, so unrelated
//! page traffic never reaches the RPC layer.

use serde_json::Value;
use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 64;

/// Envelope carried on the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Origin tag of the posting context.
    pub origin: String,
    /// JSON body following the realm message schema.
    pub body: Value,
}

/// Handle onto the shared bus, bound to one origin.
///
/// Cloning yields another handle on the same underlying channel with the
/// same origin; both realms of one page hold clones of one bus.
#[derive(Debug, Clone)]
pub struct MessageBus {
    origin: String,
    tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
    pub fn new(origin: &str) -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            origin: origin.to_string(),
            tx,
        }
    }

    /// A handle on the same channel tagged with a different origin.
    /// Anything posted through it is foreign traffic to this bus's realms.
    pub fn with_origin(&self, origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            tx: self.tx.clone(),
        }
    }

    /// Post a message. Delivery is best-effort: with no live subscriber the
    /// message is dropped, matching fire-and-forget page messaging.
    pub fn post(&self, body: Value) {
        let _ = self.tx.send(BusMessage {
            origin: self.origin.clone(),
            body,
        });
    }

    /// Subscribe to same-origin traffic.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            origin: self.origin.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving end of the bus, filtered to one origin.
pub struct BusReceiver {
    origin: String,
    rx: broadcast::Receiver<BusMessage>,
}

impl BusReceiver {
    /// Next same-origin message, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if msg.origin == self.origin => return Some(msg.body),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
