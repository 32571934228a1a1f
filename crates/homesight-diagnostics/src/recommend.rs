//! Evidence-based recommendation engine.
//!
//! Every emitted string names the observation supporting it and never
//! speculates: each item carries an `Evidence:` / `Observable pattern:` /
//! `Observation:` clause, and the forbidden speculation vocabulary is
//! asserted absent in tests.

use homesight_core::DiagnosticsConfig;
use homesight_intent::Intent;
use homesight_patterns::{human_duration, PatternType};

use crate::context::DiagnosticContext;

/// Vocabulary that denotes speculation and must never appear.
pub const FORBIDDEN_SPECULATION: &[&str] = &["may be", "possibly", "might", "could be", "likely"];

/// Manufacturers whose proprietary app owns device-native automations.
const MANUFACTURER_APPS: &[(&str, &str)] = &[
    ("sengled", "Sengled Home"),
    ("philips", "Philips Hue"),
    ("lifx", "LIFX"),
    ("wyze", "Wyze"),
    ("tp-link", "Kasa Smart"),
];

/// Build the ordered recommendation list from observed evidence only.
pub fn build_recommendations(
    intent: Intent,
    context: &DiagnosticContext,
    config: &DiagnosticsConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    // R1: manufacturer-app priority.
    if let Some(device) = &context.device {
        if let Some(manufacturer) = &device.manufacturer {
            let lowered = manufacturer.to_lowercase();
            let app = MANUFACTURER_APPS
                .iter()
                .find(|(key, _)| lowered.contains(key))
                .map(|(_, app)| *app);
            if let Some(app) = app {
                if context.has_signals() {
                    recommendations.push(format!(
                        "PRIORITY — Open {} to check device-native automations. Evidence: device manufacturer is {}.",
                        app, manufacturer
                    ));
                }
            }
        }
    }

    // R2: offline health.
    if let Some(health) = &context.health_data {
        if health.online == Some(false) {
            recommendations.push(
                "Action: Check device power supply and network connectivity. Evidence: device reports offline."
                    .to_string(),
            );
        }

        // R3: low battery.
        if let Some(level) = health.battery_percentage() {
            if level < config.battery_low {
                recommendations.push(format!(
                    "Action: Replace battery ({}% remaining). Evidence: battery reading from device status.",
                    level
                ));
            }
        }
    }

    // R4: rapid-change pattern.
    let rapid = context.related_issues.iter().find(|p| {
        matches!(
            p.pattern_type,
            PatternType::RapidChanges | PatternType::AutomationConflict
        ) && p.confidence >= 0.85
    });
    if let Some(pattern) = rapid {
        recommendations.push(format!(
            "Observable pattern: {} state changes in {}, confidence {:.0}%. Action: Check SmartThings app → Automations for rules affecting this device.",
            pattern.occurrences,
            human_duration(config.rapid_gap_ms),
            pattern.confidence * 100.0
        ));
        if pattern.occurrences >= 5 {
            recommendations.push(
                "ALERT: Multiple rapid changes suggest an automation loop. Review automation conditions."
                    .to_string(),
            );
        }
    }

    // R5: motion-sensor guidance, gated on an identified rule that
    // actually uses a motion sensor. No rule, no motion talk.
    if let Some(automations) = &context.identified_automations {
        if let Some(rule) = automations.iter().find(|r| r.involves_motion_sensor()) {
            recommendations.push(format!(
                "Observation: automation rule \"{}\" uses a motion sensor trigger. Action: Review that rule's motion sensor placement and timing.",
                rule.rule_name
            ));
        }
    }

    // R6: connectivity gap.
    if let Some(pattern) = context
        .related_issues
        .iter()
        .find(|p| p.pattern_type == PatternType::ConnectivityGap)
    {
        recommendations.push(format!(
            "Evidence: {}. Action: Check device range to hub and network stability.",
            pattern.description
        ));
    }

    // R7: API limitation.
    let automations_empty = context
        .identified_automations
        .as_ref()
        .map(|rules| rules.is_empty())
        .unwrap_or(true);
    if intent == Intent::IssueDiagnosis && automations_empty {
        recommendations.push(
            "API Limitation: automation list is not accessible for this device. Manual step: open the SmartThings app → Automations to inspect rules."
                .to_string(),
        );
    }

    // R8: normal path.
    if recommendations.is_empty()
        && context.related_issues.len() == 1
        && context.related_issues[0].pattern_type == PatternType::Normal
    {
        recommendations.push("No unusual patterns detected in recent activity.".to_string());
    }

    recommendations
}
