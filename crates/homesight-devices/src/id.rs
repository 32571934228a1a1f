//! Universal device identifiers.
//!
//! Every component above the platform adapter trades exclusively in
//! universal ids of the form `"<platform>:<platform-specific-id>"`.
//! [`UniversalDeviceId::native_id`] is the single extraction point for the
//! platform-specific half; concrete adapters call it at the API boundary
//! and nowhere else. Skipping that extraction produces 400-class platform
//! errors that surface to callers as "no data".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use homesight_core::{Error, Result};

/// `"<platform>:<platform-specific-id>"` identifier used throughout the
/// diagnostic core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniversalDeviceId(String);

impl UniversalDeviceId {
    /// Build an id from its two halves.
    pub fn new(platform: impl AsRef<str>, native_id: impl AsRef<str>) -> Self {
        Self(format!("{}:{}", platform.as_ref(), native_id.as_ref()))
    }

    /// Parse a raw string, validating the `platform:id` shape.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        match raw.split_once(':') {
            Some((platform, native)) if !platform.is_empty() && !native.is_empty() => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(Error::InvalidId(format!(
                "expected \"platform:id\", got {:?}",
                raw
            ))),
        }
    }

    /// The platform half (e.g. `smartthings`).
    pub fn platform(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }

    /// The platform-specific half. This is the only sanctioned extraction
    /// point; adapters call it immediately before invoking a concrete SDK.
    pub fn native_id(&self) -> &str {
        self.0.split_once(':').map(|(_, n)| n).unwrap_or(&self.0)
    }

    /// Full `platform:id` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniversalDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UniversalDeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
