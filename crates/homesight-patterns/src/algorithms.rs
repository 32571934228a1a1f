//! The four detection algorithms.
//!
//! Three are pure functions over the event list; battery degradation asks
//! the platform for a status snapshot. Each returns at most one pattern.

use std::collections::HashMap;

use chrono::Timelike;

use homesight_core::Result;
use homesight_devices::{DeviceEvent, DeviceService, UniversalDeviceId};

use crate::config::PatternConfig;
use crate::types::{human_duration, IssuePattern, PatternType, Severity};

const HOUR_MS: i64 = 3_600_000;

/// Attributes that carry binary device state.
const STATE_ATTRIBUTES: &[&str] = &["switch", "lock", "contact"];

/// Values that indicate a failure when repeated.
const FAILURE_MARKERS: &[&str] = &["offline", "unavailable", "error", "fail"];

/// A. Connectivity gap: the largest silence between consecutive events.
pub(crate) fn connectivity_gap(
    events: &[DeviceEvent],
    config: &PatternConfig,
) -> Option<IssuePattern> {
    if events.len() < 2 {
        return None;
    }

    let mut epochs: Vec<i64> = events.iter().map(|e| e.epoch).collect();
    epochs.sort_unstable();

    let mut largest = 0i64;
    let mut gap_count = 0usize;
    for pair in epochs.windows(2) {
        let delta = pair[1] - pair[0];
        largest = largest.max(delta);
        if delta >= config.connectivity_gap_ms {
            gap_count += 1;
        }
    }

    let (severity, score, confidence) = if largest >= 24 * HOUR_MS {
        (Severity::Critical, 1.0, 0.85)
    } else if largest >= 12 * HOUR_MS {
        (Severity::High, 0.8, 0.82)
    } else if largest >= 6 * HOUR_MS {
        (Severity::Medium, 0.6, 0.8)
    } else if largest >= config.connectivity_gap_ms {
        (Severity::Low, 0.3, 0.75)
    } else {
        return None;
    };

    Some(IssuePattern {
        pattern_type: PatternType::ConnectivityGap,
        description: format!(
            "{} gap between consecutive events",
            human_duration(largest)
        ),
        occurrences: gap_count,
        confidence,
        severity,
        score,
    })
}

/// Whether a value transition looks like an automation firing the device.
fn is_activation(from: &serde_json::Value, to: &serde_json::Value) -> bool {
    let from = from.as_str().unwrap_or("").to_lowercase();
    let to = to.as_str().unwrap_or("").to_lowercase();
    matches!(
        (from.as_str(), to.as_str()),
        ("off", "on") | ("closed", "open") | ("locked", "unlocked")
    )
}

/// B. Automation conflict / rapid changes over binary state attributes.
pub(crate) fn automation_conflict(
    events: &[DeviceEvent],
    config: &PatternConfig,
) -> Option<IssuePattern> {
    let mut state_events: Vec<&DeviceEvent> = events
        .iter()
        .filter(|e| STATE_ATTRIBUTES.contains(&e.attribute.as_str()))
        .collect();
    state_events.sort_by_key(|e| e.epoch);

    let mut rapid = 0usize;
    let mut has_immediate = false;
    let mut odd_hour = false;

    for pair in state_events.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev.attribute != next.attribute || prev.value == next.value {
            continue;
        }
        let delta = next.epoch - prev.epoch;
        if delta >= config.rapid_gap_ms {
            continue;
        }

        rapid += 1;
        if delta < config.automation_gap_ms && is_activation(&prev.value, &next.value) {
            has_immediate = true;
        }
        if (1..5).contains(&prev.time.hour()) || (1..5).contains(&next.time.hour()) {
            odd_hour = true;
        }
    }

    // A single re-trigger only matters when it looks like an automation
    // override; two or more rapid flips always do.
    if rapid == 0 || (rapid < 2 && !has_immediate) {
        return None;
    }

    let severity = if rapid > 10 {
        Severity::High
    } else if rapid >= 5 {
        Severity::Medium
    } else {
        Severity::Low
    };
    let confidence = if odd_hour && has_immediate {
        0.98
    } else if has_immediate {
        0.95
    } else {
        0.88
    };
    let score = if rapid >= 10 {
        0.9
    } else if rapid >= 5 {
        0.7
    } else {
        0.5
    };

    let mut description = format!(
        "{} rapid state changes within {} of each other",
        rapid,
        human_duration(config.rapid_gap_ms)
    );
    if odd_hour {
        description.push_str("; includes activity between 01:00 and 05:00");
    }

    Some(IssuePattern {
        pattern_type: if has_immediate {
            PatternType::AutomationConflict
        } else {
            PatternType::RapidChanges
        },
        description,
        occurrences: rapid,
        confidence,
        severity,
        score,
    })
}

/// C. Event anomaly: repeated failures or an event storm, whichever
/// scores higher.
pub(crate) fn event_anomaly(
    events: &[DeviceEvent],
    config: &PatternConfig,
) -> Option<IssuePattern> {
    let failures = repeated_failures(events, config);
    let storm = event_storm(events, config);
    match (failures, storm) {
        (Some(f), Some(s)) => Some(if s.score >= f.score { s } else { f }),
        (f, s) => f.or(s),
    }
}

fn repeated_failures(events: &[DeviceEvent], config: &PatternConfig) -> Option<IssuePattern> {
    let mut groups: HashMap<&str, Vec<&DeviceEvent>> = HashMap::new();
    for event in events {
        groups.entry(event.attribute.as_str()).or_default().push(event);
    }

    let mut best: Option<(usize, &str, String)> = None; // (run, attribute, value)
    for (attribute, mut group) in groups {
        group.sort_by_key(|e| e.epoch);

        let mut run = 0usize;
        let mut prev_value: Option<String> = None;
        for event in group {
            let value = event.value_text().to_lowercase();
            let indicative = FAILURE_MARKERS.iter().any(|marker| value.contains(marker));
            if indicative && prev_value.as_deref() == Some(value.as_str()) {
                run += 1;
            } else if indicative {
                run = 1;
            } else {
                run = 0;
            }
            prev_value = Some(value.clone());

            if run >= config.failure_run {
                let better = best.as_ref().map(|(r, _, _)| run > *r).unwrap_or(true);
                if better {
                    best = Some((run, attribute, value.clone()));
                }
            }
        }
    }

    best.map(|(run, attribute, value)| IssuePattern {
        pattern_type: PatternType::RepeatedFailures,
        description: format!(
            "{} consecutive {:?} readings on {}",
            run, value, attribute
        ),
        occurrences: run,
        confidence: 0.9,
        severity: Severity::High,
        score: 0.8,
    })
}

fn event_storm(events: &[DeviceEvent], config: &PatternConfig) -> Option<IssuePattern> {
    if events.len() < config.storm_count {
        return None;
    }

    let mut epochs: Vec<i64> = events.iter().map(|e| e.epoch).collect();
    epochs.sort_unstable();

    let mut peak = 0usize;
    let mut start = 0usize;
    for end in 0..epochs.len() {
        while epochs[end] - epochs[start] > config.storm_window_ms {
            start += 1;
        }
        peak = peak.max(end - start + 1);
    }

    if peak < config.storm_count {
        return None;
    }
    Some(IssuePattern {
        pattern_type: PatternType::EventAnomaly,
        description: format!(
            "{} events within {}",
            peak,
            human_duration(config.storm_window_ms)
        ),
        occurrences: peak,
        confidence: 0.95,
        severity: Severity::High,
        score: 0.85,
    })
}

/// D. Battery degradation from the platform status snapshot.
///
/// Absent battery data and missing devices emit nothing; transport
/// failures surface so the detector can record them.
pub(crate) async fn battery_degradation(
    service: &dyn DeviceService,
    device_id: &UniversalDeviceId,
    config: &PatternConfig,
) -> Result<Option<IssuePattern>> {
    let status = match service.get_device_status(device_id).await {
        Ok(status) => status,
        Err(e) if e.is_no_data() => return Ok(None),
        Err(e) => return Err(e),
    };

    let level = match status.battery_percentage() {
        Some(level) => level,
        None => return Ok(None),
    };

    let medium_bound = config.battery_low.saturating_add(10);
    let (severity, score, confidence) = if level < config.battery_critical {
        (Severity::Critical, 1.0, 1.0)
    } else if level < config.battery_low {
        (Severity::High, 0.7, 0.95)
    } else if level < medium_bound {
        (Severity::Medium, 0.4, 0.9)
    } else {
        return Ok(None);
    };

    Ok(Some(IssuePattern {
        pattern_type: PatternType::BatteryDegradation,
        description: format!("Battery at {}%", level),
        occurrences: 1,
        confidence,
        severity,
        score,
    }))
}
