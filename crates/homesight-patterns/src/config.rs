//! Detection thresholds.

use homesight_core::DiagnosticsConfig;

/// Thresholds the four algorithms run with.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    /// Minimum inter-event silence that counts as a connectivity gap.
    pub connectivity_gap_ms: i64,
    /// Maximum delta between state changes that counts as rapid.
    pub rapid_gap_ms: i64,
    /// Maximum delta that looks like an automation override.
    pub automation_gap_ms: i64,
    /// Event-storm rolling window.
    pub storm_window_ms: i64,
    /// Events within the window that trip the storm signal.
    pub storm_count: usize,
    /// Consecutive identical failure values that trip repeated-failures.
    pub failure_run: usize,
    /// Battery percentage treated as low.
    pub battery_low: u8,
    /// Battery percentage treated as critical.
    pub battery_critical: u8,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self::from(&DiagnosticsConfig::default())
    }
}

impl From<&DiagnosticsConfig> for PatternConfig {
    fn from(config: &DiagnosticsConfig) -> Self {
        Self {
            connectivity_gap_ms: config.connectivity_gap_ms,
            rapid_gap_ms: config.rapid_gap_ms,
            automation_gap_ms: config.automation_gap_ms,
            storm_window_ms: config.storm_window_ms,
            storm_count: config.storm_count,
            failure_run: config.failure_run,
            battery_low: config.battery_low,
            battery_critical: config.battery_critical,
        }
    }
}
