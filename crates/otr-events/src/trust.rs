//! Device trust enumerations.
//!
//! Both enumerations are closed sets with stable integer discriminants, so
//! they can cross an FFI or storage boundary as plain integers as well as by
//! their lowercase names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Whether a device's identity was marked trusted at the moment of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum VerificationType {
    /// The device was manually confirmed as trusted.
    Verified = 0,
    /// The device's trust was withdrawn.
    Unverified = 1,
}

impl VerificationType {
    /// All variants, in discriminant order.
    pub const ALL: [VerificationType; 2] =
        [VerificationType::Verified, VerificationType::Unverified];

    /// Returns the integer discriminant.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationType::Verified => "verified",
            VerificationType::Unverified => "unverified",
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "verified" => Ok(VerificationType::Verified),
            "unverified" => Ok(VerificationType::Unverified),
            _ => Err(AnalyticsError::InvalidValue {
                kind: "verification type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<u8> for VerificationType {
    type Error = AnalyticsError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(VerificationType::Verified),
            1 => Ok(VerificationType::Unverified),
            _ => Err(AnalyticsError::InvalidValue {
                kind: "verification type",
                value: value.to_string(),
            }),
        }
    }
}

/// Who owns the device an event is about.
///
/// `Own` is the acting user's device; its name on the wire is `"self"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OwnerType {
    /// One of the acting user's own devices.
    #[serde(rename = "self")]
    Own = 0,
    /// A device of another conversation participant.
    #[serde(rename = "other")]
    Other = 1,
}

impl OwnerType {
    /// All variants, in discriminant order.
    pub const ALL: [OwnerType; 2] = [OwnerType::Own, OwnerType::Other];

    /// Returns the integer discriminant.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerType::Own => "self",
            OwnerType::Other => "other",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "self" | "own" => Ok(OwnerType::Own),
            "other" => Ok(OwnerType::Other),
            _ => Err(AnalyticsError::InvalidValue {
                kind: "owner type",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<u8> for OwnerType {
    type Error = AnalyticsError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(OwnerType::Own),
            1 => Ok(OwnerType::Other),
            _ => Err(AnalyticsError::InvalidValue {
                kind: "owner type",
                value: value.to_string(),
            }),
        }
    }
}
