//! Device-trust event definitions.
//!
//! An [`Event`] names what happened; an [`Envelope`] wraps it with the
//! identity, ordering and time information a sink needs. Envelopes encode to
//! JSON for line-oriented storage and to MessagePack for compact transport.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::trust::{OwnerType, VerificationType};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Attribute key carrying the device owner on verification changes.
pub const DEVICE_OWNER_ATTRIBUTE: &str = "device_owner";

/// Caller-defined event attributes.
///
/// The schema is opaque to this crate: keys and values are whatever the
/// caller and the receiving sink agree on.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Analytics event names.
pub mod names {
    pub const DELETED_DEVICE: &str = "e2ee.deleted_device";
    pub const VERIFIED_DEVICE: &str = "e2ee.verified_device";
    pub const UNVERIFIED_DEVICE: &str = "e2ee.unverified_device";
    pub const VERIFIED_CONVERSATION: &str = "e2ee.verified_conversation";
    pub const VIEWED_OWN_DEVICES: &str = "e2ee.viewed_own_devices";
    pub const VIEWED_OTHER_DEVICES: &str = "e2ee.viewed_other_devices";
    pub const CANNOT_DECRYPT_MESSAGE: &str = "e2ee.cannot_decrypt_message";
}

/// A device-trust lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// A device was removed.
    DeleteDevice,
    /// A device's trust state changed.
    ChangeDeviceVerification {
        /// The new trust state.
        verification: VerificationType,
        /// Who owns the device.
        owner: OwnerType,
    },
    /// Every participant device in a conversation is verified.
    ConversationIsVerified,
    /// The user opened their own device list.
    SelfDeviceList,
    /// The user opened another participant's device list.
    OtherDeviceList,
    /// A message could not be decrypted.
    CannotDecryptMessage {
        /// Context supplied by the caller, forwarded unmodified.
        attributes: Attributes,
    },
}

impl Event {
    /// Returns the analytics event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::DeleteDevice => names::DELETED_DEVICE,
            Event::ChangeDeviceVerification { verification, .. } => match verification {
                VerificationType::Verified => names::VERIFIED_DEVICE,
                VerificationType::Unverified => names::UNVERIFIED_DEVICE,
            },
            Event::ConversationIsVerified => names::VERIFIED_CONVERSATION,
            Event::SelfDeviceList => names::VIEWED_OWN_DEVICES,
            Event::OtherDeviceList => names::VIEWED_OTHER_DEVICES,
            Event::CannotDecryptMessage { .. } => names::CANNOT_DECRYPT_MESSAGE,
        }
    }

    /// Returns the flat attribute map a backend transmits with the event.
    pub fn attributes(&self) -> Attributes {
        match self {
            Event::ChangeDeviceVerification { owner, .. } => {
                let mut attributes = Attributes::new();
                attributes.insert(
                    DEVICE_OWNER_ATTRIBUTE.to_string(),
                    serde_json::Value::String(owner.as_str().to_string()),
                );
                attributes
            }
            Event::CannotDecryptMessage { attributes } => attributes.clone(),
            _ => Attributes::new(),
        }
    }
}

/// Envelope wrapper for a tagged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope format version.
    pub version: u8,
    /// Unique event identifier.
    pub id: Uuid,
    /// Per-tagger sequence number, starting at 1. Not unique across taggers
    /// or processes; use `id` for identity.
    pub sequence: u64,
    /// When the event was tagged.
    pub timestamp: SystemTime,
    /// The event itself.
    pub event: Event,
}

impl Envelope {
    /// Create a new envelope with a fresh id and the current time.
    pub fn new(sequence: u64, event: Event) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            id: Uuid::new_v4(),
            sequence,
            timestamp: SystemTime::now(),
            event,
        }
    }

    /// Shorthand for `self.event.name()`.
    pub fn name(&self) -> &'static str {
        self.event.name()
    }

    /// Serialize the envelope to a single-line JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize an envelope from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the envelope to MessagePack bytes.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
