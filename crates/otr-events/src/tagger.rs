//! Device-trust event tagging.
//!
//! [`DeviceTrustEvents`] is the contract application code calls when it
//! witnesses a device-trust transition. Every operation is fire-and-forget:
//! nothing is returned and sink failures never reach the caller.
//!
//! [`Analytics`] is the standard implementation. It forwards each call as one
//! [`Envelope`] to an injected [`EventSink`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::{Attributes, Envelope, Event};
use crate::sink::EventSink;
use crate::trust::{OwnerType, VerificationType};

/// Tagging operations for device-trust lifecycle events.
///
/// Implementors only provide [`tag_event`](Self::tag_event); the named
/// operations build the matching [`Event`] and hand it over.
pub trait DeviceTrustEvents {
    /// Emit a single event. Must not block or fail observably.
    fn tag_event(&self, event: Event);

    /// A device was removed.
    fn tag_delete_device(&self) {
        self.tag_event(Event::DeleteDevice);
    }

    /// A device's trust state changed.
    fn tag_change_device_verification(&self, verification: VerificationType, owner: OwnerType) {
        self.tag_event(Event::ChangeDeviceVerification {
            verification,
            owner,
        });
    }

    /// Every participant device in a conversation reached verified state.
    fn tag_conversation_is_verified(&self) {
        self.tag_event(Event::ConversationIsVerified);
    }

    /// The user viewed their own device list.
    fn tag_self_device_list(&self) {
        self.tag_event(Event::SelfDeviceList);
    }

    /// The user viewed another participant's device list.
    fn tag_other_device_list(&self) {
        self.tag_event(Event::OtherDeviceList);
    }

    /// A message failed to decrypt. `attributes` are forwarded unmodified.
    fn tag_cannot_decrypt_message_with_attributes(&self, attributes: Attributes) {
        self.tag_event(Event::CannotDecryptMessage { attributes });
    }
}

/// Counters describing what a tagger has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsStats {
    /// Events accepted by the sink.
    pub emitted: u64,
    /// Events the sink rejected.
    pub dropped: u64,
    /// Events not forwarded because tagging was disabled.
    pub suppressed: u64,
}

/// Tagger forwarding events to an injected sink.
///
/// `Analytics` is `Send + Sync`; share it behind an `Arc` to tag from
/// several threads. Sequence numbers start at 1 and only advance for events
/// that are forwarded.
pub struct Analytics {
    sink: Arc<dyn EventSink>,
    enabled: AtomicBool,
    next_sequence: AtomicU64,
    emitted: AtomicU64,
    dropped: AtomicU64,
    suppressed: AtomicU64,
}

impl Analytics {
    /// Creates an enabled tagger forwarding to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            enabled: AtomicBool::new(true),
            next_sequence: AtomicU64::new(1),
            emitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Turns tagging on or off. Disabled taggers forward nothing.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!(
                "Analytics tagging {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    /// Returns whether tagging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the tagging counters.
    pub fn stats(&self) -> AnalyticsStats {
        AnalyticsStats {
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }

    /// Returns the injected sink.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Flushes the sink. Failures are logged, not returned.
    pub fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            tracing::warn!("Failed to flush analytics sink: {}", e);
        }
    }
}

impl DeviceTrustEvents for Analytics {
    fn tag_event(&self, event: Event) {
        if !self.is_enabled() {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Analytics disabled, suppressing {}", event.name());
            return;
        }

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope::new(sequence, event);

        match self.sink.record(&envelope) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Tagged {} (#{})", envelope.name(), sequence);
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropped analytics event {}: {}", envelope.name(), e);
            }
        }
    }
}
