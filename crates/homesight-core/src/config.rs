//! Configuration snapshot for the diagnostic core.
//!
//! All tunables recognised by the pipeline live here with their defaults,
//! so individual crates do not re-define the same constants. The snapshot
//! is built once at startup (from the environment or programmatically) and
//! is read-only afterwards.

use serde::{Deserialize, Serialize};

/// Default values for every recognised option.
pub mod defaults {
    /// Classifier cache TTL in milliseconds (15 minutes).
    pub const CACHE_TTL_MS: u64 = 900_000;
    /// Minimum similarity for semantic device resolution.
    pub const SEMANTIC_MIN_SIMILARITY: f32 = 0.7;
    /// Connectivity-gap threshold in milliseconds (1 hour).
    pub const PATTERN_CONNECTIVITY_GAP_MS: i64 = 3_600_000;
    /// Rapid state-change threshold in milliseconds.
    pub const PATTERN_RAPID_GAP_MS: i64 = 10_000;
    /// Automation-trigger threshold in milliseconds.
    pub const PATTERN_AUTOMATION_GAP_MS: i64 = 5_000;
    /// Event-storm rolling window in milliseconds.
    pub const PATTERN_STORM_WINDOW_MS: i64 = 60_000;
    /// Event count within the storm window that trips the anomaly.
    pub const PATTERN_STORM_COUNT: usize = 20;
    /// Consecutive identical failure values that trip repeated-failures.
    pub const PATTERN_FAILURE_RUN: usize = 5;
    /// Battery percentage treated as low.
    pub const BATTERY_LOW: u8 = 20;
    /// Battery percentage treated as critical.
    pub const BATTERY_CRITICAL: u8 = 10;
    /// Periodic index sync interval in milliseconds (0 disables).
    pub const SEMANTIC_SYNC_INTERVAL_MS: u64 = 300_000;
    /// Deadline for the LLM classification call in milliseconds.
    pub const LLM_CLASSIFY_TIMEOUT_MS: u64 = 10_000;
    /// Deadline for platform-API status/event calls in milliseconds.
    pub const API_CALL_TIMEOUT_MS: u64 = 5_000;
}

/// Environment variable names.
pub mod env_vars {
    pub const CACHE_TTL_MS: &str = "CACHE_TTL_MS";
    pub const SEMANTIC_MIN_SIMILARITY: &str = "SEMANTIC_MIN_SIMILARITY";
    pub const PATTERN_CONNECTIVITY_GAP_MS: &str = "PATTERN_CONNECTIVITY_GAP_MS";
    pub const PATTERN_RAPID_GAP_MS: &str = "PATTERN_RAPID_GAP_MS";
    pub const PATTERN_AUTOMATION_GAP_MS: &str = "PATTERN_AUTOMATION_GAP_MS";
    pub const PATTERN_STORM_WINDOW_MS: &str = "PATTERN_STORM_WINDOW_MS";
    pub const PATTERN_STORM_COUNT: &str = "PATTERN_STORM_COUNT";
    pub const PATTERN_FAILURE_RUN: &str = "PATTERN_FAILURE_RUN";
    pub const BATTERY_LOW: &str = "BATTERY_LOW";
    pub const BATTERY_CRITICAL: &str = "BATTERY_CRITICAL";
    pub const SEMANTIC_SYNC_INTERVAL_MS: &str = "SEMANTIC_SYNC_INTERVAL_MS";
    pub const LLM_CLASSIFY_TIMEOUT_MS: &str = "LLM_CLASSIFY_TIMEOUT_MS";
}

/// Read-only configuration snapshot shared by all pipeline components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub cache_ttl_ms: u64,
    pub semantic_min_similarity: f32,
    pub connectivity_gap_ms: i64,
    pub rapid_gap_ms: i64,
    pub automation_gap_ms: i64,
    pub storm_window_ms: i64,
    pub storm_count: usize,
    pub failure_run: usize,
    pub battery_low: u8,
    pub battery_critical: u8,
    pub semantic_sync_interval_ms: u64,
    pub llm_classify_timeout_ms: u64,
    pub api_call_timeout_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: defaults::CACHE_TTL_MS,
            semantic_min_similarity: defaults::SEMANTIC_MIN_SIMILARITY,
            connectivity_gap_ms: defaults::PATTERN_CONNECTIVITY_GAP_MS,
            rapid_gap_ms: defaults::PATTERN_RAPID_GAP_MS,
            automation_gap_ms: defaults::PATTERN_AUTOMATION_GAP_MS,
            storm_window_ms: defaults::PATTERN_STORM_WINDOW_MS,
            storm_count: defaults::PATTERN_STORM_COUNT,
            failure_run: defaults::PATTERN_FAILURE_RUN,
            battery_low: defaults::BATTERY_LOW,
            battery_critical: defaults::BATTERY_CRITICAL,
            semantic_sync_interval_ms: defaults::SEMANTIC_SYNC_INTERVAL_MS,
            llm_classify_timeout_ms: defaults::LLM_CLASSIFY_TIMEOUT_MS,
            api_call_timeout_ms: defaults::API_CALL_TIMEOUT_MS,
        }
    }
}

impl DiagnosticsConfig {
    /// Build a snapshot from the process environment, falling back to
    /// defaults for unset or unparsable values (unparsable values log a
    /// warning rather than failing startup).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        read_env(env_vars::CACHE_TTL_MS, &mut cfg.cache_ttl_ms);
        read_env(
            env_vars::SEMANTIC_MIN_SIMILARITY,
            &mut cfg.semantic_min_similarity,
        );
        read_env(
            env_vars::PATTERN_CONNECTIVITY_GAP_MS,
            &mut cfg.connectivity_gap_ms,
        );
        read_env(env_vars::PATTERN_RAPID_GAP_MS, &mut cfg.rapid_gap_ms);
        read_env(
            env_vars::PATTERN_AUTOMATION_GAP_MS,
            &mut cfg.automation_gap_ms,
        );
        read_env(env_vars::PATTERN_STORM_WINDOW_MS, &mut cfg.storm_window_ms);
        read_env(env_vars::PATTERN_STORM_COUNT, &mut cfg.storm_count);
        read_env(env_vars::PATTERN_FAILURE_RUN, &mut cfg.failure_run);
        read_env(env_vars::BATTERY_LOW, &mut cfg.battery_low);
        read_env(env_vars::BATTERY_CRITICAL, &mut cfg.battery_critical);
        read_env(
            env_vars::SEMANTIC_SYNC_INTERVAL_MS,
            &mut cfg.semantic_sync_interval_ms,
        );
        read_env(
            env_vars::LLM_CLASSIFY_TIMEOUT_MS,
            &mut cfg.llm_classify_timeout_ms,
        );
        cfg
    }
}

fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable value for {}: {:?}", name, raw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DiagnosticsConfig::default();
        assert_eq!(cfg.cache_ttl_ms, 900_000);
        assert_eq!(cfg.connectivity_gap_ms, 3_600_000);
        assert_eq!(cfg.storm_count, 20);
        assert_eq!(cfg.battery_critical, 10);
    }

    #[test]
    fn test_from_env_override() {
        std::env::set_var(env_vars::BATTERY_LOW, "25");
        let cfg = DiagnosticsConfig::from_env();
        assert_eq!(cfg.battery_low, 25);
        std::env::remove_var(env_vars::BATTERY_LOW);
    }

    #[test]
    fn test_from_env_bad_value_falls_back() {
        std::env::set_var(env_vars::PATTERN_STORM_COUNT, "lots");
        let cfg = DiagnosticsConfig::from_env();
        assert_eq!(cfg.storm_count, defaults::PATTERN_STORM_COUNT);
        std::env::remove_var(env_vars::PATTERN_STORM_COUNT);
    }
}
