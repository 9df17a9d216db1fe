//! Transcript acquisition pipeline.
//!
//! Pulls machine-readable captions out of a video page that exposes no
//! stable public API for it:
//! - two isolated execution realms talking over an async message bus
//!   ([`bus`], [`rpc`]);
//! - undocumented upstream endpoints negotiated under rotating client
//!   identities ([`page`], [`identity`], [`upstream`]);
//! - three incompatible subtitle serializations normalized to one segment
//!   model ([`parser`]);
//! - an ordered fallback chain ending in rendered-panel scraping
//!   ([`orchestrator`], [`scrape`]), delivered to the host application
//!   through an acknowledged relay boundary ([`relay`]).
//!
//! The pipeline is fatal-free by construction: every stage reports a typed
//! outcome, and the only caller-visible failure is an insufficient, empty
//! delivery.

pub mod bus;
pub mod config;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod page;
pub mod parser;
pub mod poll;
pub mod relay;
pub mod rpc;
pub mod scrape;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub(crate) mod tests;

pub use bus::MessageBus;
pub use config::PipelineConfig;
pub use error::{ErrorKind, FetchError};
pub use orchestrator::{ChainResult, ChainState, ExtractionSession, Orchestrator, Strategy};
pub use page::{PageConfig, PageContext, PageExtractor};
pub use relay::{DeliveryRelay, TranscriptDelivery};
pub use rpc::{Action, RpcChannel};
pub use scrape::CaptionSurface;
pub use types::{CaptionTrackDescriptor, StrategyOutcome, TranscriptSegment};
pub use upstream::{HttpUpstream, UpstreamClient};
