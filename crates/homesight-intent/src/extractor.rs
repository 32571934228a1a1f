//! Entity extraction.
//!
//! Runs on every classification, whichever tier produced the intent, and
//! only fills fields the earlier tier left empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::keywords::DEVICE_NOUNS;
use crate::types::Entities;

/// Room tokens recognised in user messages.
const ROOM_TOKENS: &[&str] = &[
    "living room",
    "bedroom",
    "kitchen",
    "bathroom",
    "garage",
    "hallway",
    "office",
    "basement",
    "attic",
    "porch",
    "alcove",
];

/// Issue phrases recognised in user messages.
const ISSUE_PHRASES: &[&str] = &[
    "turning on",
    "turning off",
    "flickering",
    "offline",
    "unresponsive",
    "not responding",
    "temperature",
    "battery",
];

/// Words never treated as a device adjective.
const ADJECTIVE_STOPWORDS: &[&str] = &[
    "my", "the", "a", "an", "your", "this", "that", "is", "of", "and", "or", "check",
];

static TIMEFRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"last night|yesterday|today|tonight|last \d+ (?:hours?|days?)|\d+\s*[hd] ago")
        .expect("static regex")
});

/// Extract entities from a lowercased message.
pub(crate) fn extract_entities(message: &str) -> Entities {
    Entities {
        device_id: None,
        device_name: extract_device_name(message),
        room_name: extract_room(message),
        timeframe: TIMEFRAME.find(message).map(|m| m.as_str().to_string()),
        issue_type: ISSUE_PHRASES
            .iter()
            .find(|phrase| message.contains(*phrase))
            .map(|phrase| phrase.to_string()),
    }
}

/// Last occurrence of any device noun wins; compound nouns beat the bare
/// noun they end with ("motion sensor" over "sensor"). A single-word noun
/// picks up one preceding adjective ("bedroom light"); compound nouns are
/// specific enough on their own.
fn extract_device_name(message: &str) -> Option<String> {
    let mut best: Option<(usize, usize, &str)> = None; // (end, len, noun)
    for noun in DEVICE_NOUNS {
        if let Some(start) = message.rfind(noun) {
            let end = start + noun.len();
            let candidate = (end, noun.len(), *noun);
            let better = match best {
                None => true,
                Some((best_end, best_len, _)) => {
                    end > best_end || (end == best_end && noun.len() > best_len)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
    }

    let (end, len, noun) = best?;
    if noun.contains(' ') {
        return Some(noun.to_string());
    }

    // One adjective in front, when it is a content word.
    let start = end - len;
    let prefix = &message[..start];
    if let Some(word) = prefix.split_whitespace().last() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if !word.is_empty() && !ADJECTIVE_STOPWORDS.contains(&word) {
            return Some(format!("{} {}", word, noun));
        }
    }
    Some(noun.to_string())
}

fn extract_room(message: &str) -> Option<String> {
    ROOM_TOKENS
        .iter()
        .filter_map(|room| message.find(room).map(|pos| (pos, *room)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, room)| room.to_string())
}
