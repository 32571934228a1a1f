//! Device event timeline types.
//!
//! Events are ephemeral: fetched per query from the platform adapter,
//! analysed, and discarded. The core never persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::id::UniversalDeviceId;

/// Gap below which consecutive events are considered continuous coverage.
const GAP_THRESHOLD_MS: i64 = 3_600_000;

/// One observation of an attribute change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Universal id of the device the event belongs to.
    pub device_id: UniversalDeviceId,
    /// Location the device is installed in, when the platform reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Event time.
    pub time: DateTime<Utc>,
    /// Milliseconds since the epoch; always agrees with `time`.
    pub epoch: i64,
    /// Component the attribute lives on (usually `main`).
    pub component: String,
    /// Capability that produced the event.
    pub capability: String,
    /// Attribute that changed.
    pub attribute: String,
    /// New value.
    pub value: serde_json::Value,
    /// Unit for numeric values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Human-readable rendering from the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Dedup digest over (device, epoch, capability, attribute, value).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl DeviceEvent {
    /// Build an event; `epoch` is derived from `time` so the two always
    /// agree, and the dedup hash is filled in.
    pub fn new(
        device_id: UniversalDeviceId,
        time: DateTime<Utc>,
        capability: impl Into<String>,
        attribute: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        let capability = capability.into();
        let attribute = attribute.into();
        let epoch = time.timestamp_millis();
        let hash = Self::digest(&device_id, epoch, &capability, &attribute, &value);
        Self {
            device_id,
            location_id: None,
            time,
            epoch,
            component: "main".to_string(),
            capability,
            attribute,
            value,
            unit: None,
            text: None,
            hash: Some(hash),
        }
    }

    fn digest(
        device_id: &UniversalDeviceId,
        epoch: i64,
        capability: &str,
        attribute: &str,
        value: &serde_json::Value,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(device_id.as_str().as_bytes());
        hasher.update(epoch.to_be_bytes());
        hasher.update(capability.as_bytes());
        hasher.update(attribute.as_bytes());
        hasher.update(value.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Value rendered without JSON quoting, for display.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Filters for an event fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: usize,
    pub capabilities: Option<Vec<String>>,
    pub attributes: Option<Vec<String>>,
    pub oldest_first: bool,
    pub include_metadata: bool,
    pub human_readable: bool,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            limit: 50,
            capabilities: None,
            attributes: None,
            oldest_first: false,
            include_metadata: true,
            human_readable: false,
        }
    }
}

impl EventQuery {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// The filters in `key=value` form, for result metadata.
    fn applied_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(start) = self.start_time {
            filters.push(format!("start_time={}", start.to_rfc3339()));
        }
        if let Some(end) = self.end_time {
            filters.push(format!("end_time={}", end.to_rfc3339()));
        }
        if let Some(capabilities) = &self.capabilities {
            filters.push(format!("capabilities={}", capabilities.join(",")));
        }
        if let Some(attributes) = &self.attributes {
            filters.push(format!("attributes={}", attributes.join(",")));
        }
        filters.push(format!("limit={}", self.limit));
        filters
    }
}

/// Covered time range of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub duration_ms: i64,
}

/// One silence between consecutive events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Metadata describing an event result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    pub total_count: usize,
    pub has_more: bool,
    pub date_range: Option<DateRange>,
    pub applied_filters: Vec<String>,
    pub reached_retention_limit: bool,
    pub gap_detected: Option<bool>,
    pub gaps: Option<Vec<EventGap>>,
    pub largest_gap_ms: Option<i64>,
}

/// Events plus the metadata and summary consumers render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceEventResult {
    pub events: Vec<DeviceEvent>,
    pub metadata: EventMetadata,
    pub summary: String,
}

impl DeviceEventResult {
    /// Empty result with no applied filters.
    pub fn empty() -> Self {
        Self {
            summary: "No events in the requested window".to_string(),
            ..Default::default()
        }
    }

    /// Assemble a result from fetched events: orders them (newest-first
    /// unless `oldest_first`), truncates to the query limit, and computes
    /// range/gap metadata over the kept events.
    pub fn from_events(mut events: Vec<DeviceEvent>, query: &EventQuery) -> Self {
        events.sort_by_key(|e| e.epoch);
        if !query.oldest_first {
            events.reverse();
        }
        let has_more = events.len() > query.limit;
        events.truncate(query.limit);

        let mut metadata = EventMetadata {
            total_count: events.len(),
            has_more,
            applied_filters: query.applied_filters(),
            ..Default::default()
        };

        if events.is_empty() {
            return Self {
                events,
                metadata,
                summary: "No events in the requested window".to_string(),
            };
        }

        let mut ascending: Vec<&DeviceEvent> = events.iter().collect();
        ascending.sort_by_key(|e| e.epoch);
        let mut summary = String::new();
        if let (Some(earliest), Some(latest)) = (ascending.first(), ascending.last()) {
            metadata.date_range = Some(DateRange {
                earliest: earliest.time,
                latest: latest.time,
                duration_ms: latest.epoch - earliest.epoch,
            });
            summary = format!(
                "{} events between {} and {}",
                metadata.total_count,
                earliest.time.to_rfc3339(),
                latest.time.to_rfc3339()
            );
        }

        let mut gaps = Vec::new();
        for pair in ascending.windows(2) {
            let delta = pair[1].epoch - pair[0].epoch;
            if delta >= GAP_THRESHOLD_MS {
                gaps.push(EventGap {
                    start: pair[0].time,
                    end: pair[1].time,
                    duration_ms: delta,
                });
            }
        }
        metadata.largest_gap_ms = gaps.iter().map(|g| g.duration_ms).max();
        metadata.gap_detected = Some(!gaps.is_empty());
        if !gaps.is_empty() {
            metadata.gaps = Some(gaps);
        }

        Self {
            events,
            metadata,
            summary,
        }
    }
}
