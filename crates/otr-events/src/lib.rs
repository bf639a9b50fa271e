//! # OTR Events Library
//!
//! This crate provides the analytics contract for device-trust (OTR) state
//! changes in a messaging client.
//!
//! ## Overview
//!
//! - **Trust Enumerations**: verification state and device ownership
//! - **Events**: the six device-trust events and their analytics names
//! - **Envelopes**: id, sequence and timestamp around each event, with JSON
//!   and MessagePack encodings
//! - **Sinks**: the backend abstraction plus memory, tracing, broadcast,
//!   fan-out and null sinks
//! - **Tagger**: the fire-and-forget tagging operations
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use otr_events::{Analytics, DeviceTrustEvents, MemorySink, OwnerType, VerificationType};
//!
//! let sink = Arc::new(MemorySink::new());
//! let analytics = Analytics::new(sink.clone());
//!
//! analytics.tag_change_device_verification(VerificationType::Verified, OwnerType::Other);
//! analytics.tag_conversation_is_verified();
//!
//! assert_eq!(sink.len().unwrap(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`trust`]: Verification and owner enumerations
//! - [`event`]: Event and envelope definitions
//! - [`sink`]: Event sinks
//! - [`tagger`]: Tagging contract and default implementation
//! - [`error`]: Error types

pub mod error;
pub mod event;
pub mod sink;
pub mod tagger;
pub mod trust;

pub use error::{AnalyticsError, Result};
pub use event::{Attributes, Envelope, Event, DEVICE_OWNER_ATTRIBUTE, ENVELOPE_VERSION};
pub use sink::{
    BroadcastSink, EventSink, FanoutSink, MemorySink, NullSink, TracingSink,
    DEFAULT_BROADCAST_CAPACITY,
};
pub use tagger::{Analytics, AnalyticsStats, DeviceTrustEvents};
pub use trust::{OwnerType, VerificationType};
