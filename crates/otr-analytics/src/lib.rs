//! # OTR Analytics
//!
//! Application side of the device-trust analytics tagger: configuration,
//! the JSON-lines file sink, and wiring a configured [`Analytics`] tagger.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use otr_analytics::{build_analytics, Config};
//! use otr_events::{DeviceTrustEvents, OwnerType, VerificationType};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let analytics = build_analytics(&config);
//!     analytics.tag_change_device_verification(VerificationType::Unverified, OwnerType::Own);
//!     analytics.flush();
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`sinks`]: File sink and sink construction

pub mod config;
pub mod sinks;

// Re-export otr-events for convenience
pub use otr_events;

pub use config::{Config, ConfigError, SinkKind};
pub use otr_events::Analytics;
pub use sinks::{build_analytics, build_sink, read_events, JsonLinesSink};
