//! Pattern types and severity semantics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern severity, ordered so `Critical` compares greatest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Known failure-pattern kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    RapidChanges,
    RepeatedFailures,
    ConnectivityGap,
    AutomationConflict,
    EventAnomaly,
    BatteryDegradation,
    Normal,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternType::RapidChanges => "rapid_changes",
            PatternType::RepeatedFailures => "repeated_failures",
            PatternType::ConnectivityGap => "connectivity_gap",
            PatternType::AutomationConflict => "automation_conflict",
            PatternType::EventAnomaly => "event_anomaly",
            PatternType::BatteryDegradation => "battery_degradation",
            PatternType::Normal => "normal",
        };
        write!(f, "{}", name)
    }
}

/// One detected pattern with its severity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePattern {
    pub pattern_type: PatternType,
    pub description: String,
    pub occurrences: usize,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    pub severity: Severity,
    /// Relative impact in [0, 1].
    pub score: f32,
}

/// Result of running every detection algorithm.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// Patterns sorted by severity, score, then type.
    pub patterns: Vec<IssuePattern>,
    pub events_analyzed: usize,
    pub all_algorithms_succeeded: bool,
    pub errors: Vec<String>,
}

/// Human-readable duration: the largest unit plus one remainder unit.
pub fn human_duration(ms: i64) -> String {
    let total_seconds = (ms / 1000).max(0);
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    fn unit(count: i64, name: &str) -> String {
        if count == 1 {
            format!("1 {}", name)
        } else {
            format!("{} {}s", count, name)
        }
    }

    if days > 0 {
        if hours > 0 {
            format!("{} {}", unit(days, "day"), unit(hours, "hour"))
        } else {
            unit(days, "day")
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!("{} {}", unit(hours, "hour"), unit(minutes, "minute"))
        } else {
            unit(hours, "hour")
        }
    } else if minutes > 0 {
        unit(minutes, "minute")
    } else {
        unit(seconds, "second")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_pattern_type_display() {
        assert_eq!(PatternType::ConnectivityGap.to_string(), "connectivity_gap");
        assert_eq!(PatternType::RapidChanges.to_string(), "rapid_changes");
        assert_eq!(PatternType::Normal.to_string(), "normal");
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(3_000), "3 seconds");
        assert_eq!(human_duration(90_000), "1 minute");
        assert_eq!(human_duration(3_600_000), "1 hour");
        assert_eq!(human_duration(26 * 3_600_000), "1 day 2 hours");
        assert_eq!(human_duration(5_400_000), "1 hour 30 minutes");
    }
}
