//! Keyword tier of the classifier.
//!
//! An ordered rule list; the first matching rule wins. Rules that need a
//! device noun only fire when the message mentions one, which keeps "why
//! is everything broken" from resolving to a device diagnosis.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Intent;

pub(crate) struct KeywordRule {
    pattern: Regex,
    intent: Intent,
    confidence: f32,
    needs_device_noun: bool,
}

/// Capability nouns recognised in user messages. Compound nouns come
/// first so "motion sensor" wins over the bare "sensor".
pub(crate) const DEVICE_NOUNS: &[&str] = &[
    "motion sensor",
    "contact sensor",
    "temperature sensor",
    "door sensor",
    "light",
    "lights",
    "lamp",
    "switch",
    "lock",
    "thermostat",
    "sensor",
    "camera",
    "plug",
    "outlet",
    "bulb",
    "shade",
];

static RULES: Lazy<Vec<KeywordRule>> = Lazy::new(|| {
    vec![
        KeywordRule {
            pattern: Regex::new(r"^/(troubleshoot|diag)\b").expect("static regex"),
            intent: Intent::ModeManagement,
            confidence: 0.95,
            needs_device_noun: false,
        },
        KeywordRule {
            pattern: Regex::new(r"enter troubleshoot|troubleshoot mode").expect("static regex"),
            intent: Intent::ModeManagement,
            confidence: 0.9,
            needs_device_noun: false,
        },
        KeywordRule {
            pattern: Regex::new(r"how is my system|system (status|doing|overview)|show.*system")
                .expect("static regex"),
            intent: Intent::SystemStatus,
            confidence: 0.9,
            needs_device_noun: false,
        },
        KeywordRule {
            pattern: Regex::new(r"\b(find|show|list) (devices? like|similar|all) |similar to ")
                .expect("static regex"),
            intent: Intent::Discovery,
            confidence: 0.85,
            needs_device_noun: false,
        },
        KeywordRule {
            pattern: Regex::new(r"\b(why|what'?s wrong|not working|broken|stopped|issue)")
                .expect("static regex"),
            intent: Intent::IssueDiagnosis,
            confidence: 0.85,
            needs_device_noun: true,
        },
        KeywordRule {
            pattern: Regex::new(r"\b(check|status of|is .* (ok|working)|how is)")
                .expect("static regex"),
            intent: Intent::DeviceHealth,
            confidence: 0.85,
            needs_device_noun: true,
        },
    ]
});

/// Whether the message mentions any recognised device noun.
pub(crate) fn contains_device_noun(message: &str) -> bool {
    DEVICE_NOUNS.iter().any(|noun| message.contains(noun))
}

/// First matching keyword rule, if any. Expects a lowercased message.
pub(crate) fn match_keywords(message: &str) -> Option<(Intent, f32)> {
    let has_noun = contains_device_noun(message);
    for rule in RULES.iter() {
        if rule.needs_device_noun && !has_noun {
            continue;
        }
        if rule.pattern.is_match(message) {
            return Some((rule.intent, rule.confidence));
        }
    }
    None
}
