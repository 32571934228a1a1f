//! Rich-context renderer.
//!
//! Emits the Markdown block injected into the downstream chat model's
//! system prompt. Section order is fixed regardless of the order the data
//! sources settled in; sections whose data is absent are omitted entirely.

use std::fmt::Write;

use crate::context::DiagnosticContext;

/// Maximum events listed under "Recent Events".
const MAX_EVENT_LINES: usize = 10;

/// Render the context as Markdown with the fixed section order.
pub fn render_rich_context(context: &DiagnosticContext) -> String {
    let mut out = String::new();

    if let Some(device) = &context.device {
        let _ = writeln!(out, "## Device Information");
        let _ = writeln!(out, "- Name: {}", device.display_name());
        let _ = writeln!(out, "- ID: {}", device.id);
        if let Some(room) = &device.room {
            let _ = writeln!(out, "- Room: {}", room);
        }
        let _ = writeln!(out, "- Platform: {}", device.platform);
        if let Some(manufacturer) = &device.manufacturer {
            let _ = writeln!(out, "- Manufacturer: {}", manufacturer);
        }
        if let Some(model) = &device.model {
            let _ = writeln!(out, "- Model: {}", model);
        }
        if !device.capabilities.is_empty() {
            let capabilities: Vec<String> =
                device.capabilities.iter().map(|c| c.to_string()).collect();
            let _ = writeln!(out, "- Capabilities: {}", capabilities.join(", "));
        }
        out.push('\n');
    }

    if let Some(health) = &context.health_data {
        let _ = writeln!(out, "## Health Status");
        let _ = writeln!(
            out,
            "- Online: {}",
            if health.is_online() { "yes" } else { "no" }
        );
        if let Some(level) = health.battery_percentage() {
            let _ = writeln!(out, "- Battery level: {}%", level);
        }
        if let Some(last_seen) = health.last_seen {
            let _ = writeln!(out, "- Last seen: {}", last_seen.to_rfc3339());
        }
        out.push('\n');
    }

    if let Some(events) = &context.recent_events {
        let _ = writeln!(out, "## Recent Events");
        let _ = writeln!(out, "Showing up to {} newest events:", MAX_EVENT_LINES);
        for event in events.events.iter().take(MAX_EVENT_LINES) {
            let _ = writeln!(
                out,
                "- {}: {}.{} = {}",
                event.time.to_rfc3339(),
                event.capability,
                event.attribute,
                event.value_text()
            );
        }
        out.push('\n');
    }

    if !context.related_issues.is_empty() {
        let _ = writeln!(out, "## Detected Patterns");
        for pattern in &context.related_issues {
            let _ = writeln!(
                out,
                "- {} ({}, {:.0}%): {}",
                pattern.pattern_type,
                pattern.severity,
                pattern.confidence * 100.0,
                pattern.description
            );
        }
        out.push('\n');
    }

    if let Some(similar) = &context.similar_devices {
        let _ = writeln!(out, "## Similar Devices");
        for result in similar {
            let name = result
                .device
                .as_ref()
                .map(|d| d.display_name().to_string())
                .unwrap_or_else(|| result.device_id.to_string());
            let _ = writeln!(out, "- {} (similarity {:.0}%)", name, result.score * 100.0);
        }
        out.push('\n');
    }

    if let Some(automations) = &context.identified_automations {
        let _ = writeln!(out, "## Identified Automations");
        for rule in automations {
            let when = rule
                .triggered_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(
                out,
                "- {} ({}, triggered {})",
                rule.rule_name,
                rule.device_roles.join(", "),
                when
            );
        }
        out.push('\n');
    }

    if let Some(status) = &context.system_status {
        let _ = writeln!(out, "## System Status Overview");
        let _ = writeln!(
            out,
            "- Total: {} / Healthy: {} / Warning: {} / Critical: {}",
            status.total, status.healthy, status.warning, status.critical
        );
        if !status.recent_issues.is_empty() {
            let _ = writeln!(out, "### Recent Issues");
            for issue in &status.recent_issues {
                let _ = writeln!(out, "- {}", issue);
            }
        }
        if !status.system_wide_patterns.is_empty() {
            let _ = writeln!(out, "### System-Wide Patterns");
            for pattern in &status.system_wide_patterns {
                let _ = writeln!(out, "- {}", pattern);
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use homesight_devices::{
        CapabilityTag, DeviceEvent, DeviceEventResult, DeviceStatus, EventQuery, UnifiedDevice,
        UniversalDeviceId,
    };
    use homesight_patterns::{IssuePattern, PatternType, Severity};

    fn device() -> UnifiedDevice {
        UnifiedDevice::new(UniversalDeviceId::new("smartthings", "abc"), "Alcove Light")
            .with_room("hallway")
            .with_manufacturer("Sengled")
            .with_capability(CapabilityTag::Switch)
    }

    #[test]
    fn test_empty_context_renders_empty() {
        assert_eq!(render_rich_context(&DiagnosticContext::default()), "");
    }

    #[test]
    fn test_section_order_is_fixed() {
        let mut context = DiagnosticContext {
            device: Some(device()),
            health_data: Some(DeviceStatus {
                online: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        context.related_issues.push(IssuePattern {
            pattern_type: PatternType::ConnectivityGap,
            description: "2 hours gap between consecutive events".to_string(),
            occurrences: 1,
            confidence: 0.75,
            severity: Severity::Low,
            score: 0.3,
        });

        let markdown = render_rich_context(&context);
        let device_at = markdown.find("## Device Information").unwrap();
        let health_at = markdown.find("## Health Status").unwrap();
        let patterns_at = markdown.find("## Detected Patterns").unwrap();
        assert!(device_at < health_at && health_at < patterns_at);
        assert!(markdown.contains("- Online: no"));
        assert!(markdown.contains("connectivity_gap (low, 75%)"));
    }

    #[test]
    fn test_events_capped_at_ten() {
        let events: Vec<DeviceEvent> = (0..25)
            .map(|i| {
                DeviceEvent::new(
                    UniversalDeviceId::new("smartthings", "abc"),
                    DateTime::from_timestamp_millis(i * 1_000).unwrap(),
                    "switch",
                    "switch",
                    serde_json::json!("on"),
                )
            })
            .collect();
        let context = DiagnosticContext {
            recent_events: Some(DeviceEventResult::from_events(
                events,
                &EventQuery::with_limit(25),
            )),
            ..Default::default()
        };

        let markdown = render_rich_context(&context);
        let lines = markdown
            .lines()
            .filter(|l| l.starts_with("- ") && l.contains("switch.switch"))
            .count();
        assert_eq!(lines, 10);
        assert!(markdown.contains("Showing up to 10 newest events:"));
    }

    #[test]
    fn test_system_status_subsections() {
        let context = DiagnosticContext {
            system_status: Some(crate::context::SystemStatusOverview {
                total: 4,
                healthy: 2,
                warning: 1,
                critical: 1,
                recent_issues: vec!["Porch Light: offline".to_string()],
                system_wide_patterns: vec![
                    "system_wide_connectivity: 3 devices offline together".to_string(),
                ],
            }),
            ..Default::default()
        };

        let markdown = render_rich_context(&context);
        assert!(markdown.contains("## System Status Overview"));
        assert!(markdown.contains("- Total: 4 / Healthy: 2 / Warning: 1 / Critical: 1"));
        assert!(markdown.contains("### Recent Issues"));
        assert!(markdown.contains("### System-Wide Patterns"));
    }
}
