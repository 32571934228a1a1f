//! HomeSight device management crate.
//!
//! ## Architecture
//!
//! - **UniversalDeviceId**: `platform:native-id` identifier used by every
//!   component above the platform adapter
//! - **UnifiedDevice**: immutable device snapshot with a closed capability
//!   vocabulary
//! - **DeviceRegistry**: authoritative in-memory catalogue with a fuzzy
//!   last-resort resolver
//! - **DeviceService / AutomationService**: contracts the diagnostic core
//!   consumes; concrete platform adapters implement them elsewhere
//!
//! Events are fetched per query and never persisted here.

pub mod device;
pub mod error;
pub mod event;
pub mod fuzzy;
pub mod id;
pub mod registry;
pub mod service;

pub use device::{CapabilityTag, DeviceInfo, DevicePatch, DeviceStatus, UnifiedDevice};
pub use error::{HomeSightError, Result};
pub use event::{
    DateRange, DeviceEvent, DeviceEventResult, EventGap, EventMetadata, EventQuery,
};
pub use id::UniversalDeviceId;
pub use registry::DeviceRegistry;
pub use service::{AutomationRuleMatch, AutomationService, DeviceService};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
