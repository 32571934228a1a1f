//! Hybrid three-tier intent classifier.
//!
//! Tier order: cache, keyword rules, LLM. A keyword hit at or above the
//! short-circuit confidence skips the LLM entirely; LLM failures downgrade
//! to the keyword result or the conservative fallback. This function never
//! fails - every message produces a classification.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use homesight_core::{
    DiagnosticsConfig, Error, GenerationParams, LlmInput, LlmRuntime, Message, Result,
};

use crate::cache::{CacheKey, ClassificationCache};
use crate::extractor::extract_entities;
use crate::keywords::match_keywords;
use crate::types::{CacheStats, Entities, Intent, IntentClassification};

/// Keyword confidence at or above which the LLM tier is skipped.
const KEYWORD_SHORT_CIRCUIT: f32 = 0.85;

/// Minimum confidence for a cache write.
const CACHE_WRITE_MIN: f32 = 0.7;

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You classify smart-home user messages into exactly one intent:

- MODE_MANAGEMENT: entering or leaving troubleshooting mode
- DEVICE_HEALTH: checking whether a specific device is healthy
- ISSUE_DIAGNOSIS: diagnosing why a device misbehaved
- DISCOVERY: finding devices similar to a description
- SYSTEM_STATUS: an overview of the whole home
- NORMAL_QUERY: anything else

Reply with a strict JSON object and nothing else:
{"intent": "...", "confidence": 0.0-1.0, "entities": {"deviceId": null, "deviceName": null, "roomName": null, "timeframe": null, "issueType": null}, "requiresDiagnostics": true|false, "reasoning": "one sentence"}"#;

/// Loosely-shaped reply the LLM is asked to produce.
#[derive(Debug, Deserialize)]
struct LlmReply {
    intent: String,
    confidence: Option<f32>,
    #[serde(default)]
    entities: Option<Entities>,
    #[serde(rename = "requiresDiagnostics")]
    requires_diagnostics: Option<bool>,
    reasoning: Option<String>,
}

/// Hybrid keyword/LLM classifier with a TTL cache.
pub struct IntentClassifier {
    llm: Option<Arc<dyn LlmRuntime>>,
    cache: parking_lot::Mutex<ClassificationCache>,
    llm_timeout: Duration,
}

impl IntentClassifier {
    /// Classifier with an LLM slow path and default configuration.
    pub fn new(llm: Arc<dyn LlmRuntime>) -> Self {
        Self::with_config(Some(llm), &DiagnosticsConfig::default())
    }

    /// Classifier without an LLM: cache + keyword rules only.
    pub fn keyword_only() -> Self {
        Self::with_config(None, &DiagnosticsConfig::default())
    }

    /// Classifier with explicit configuration.
    pub fn with_config(llm: Option<Arc<dyn LlmRuntime>>, config: &DiagnosticsConfig) -> Self {
        Self {
            llm,
            cache: parking_lot::Mutex::new(ClassificationCache::new(Duration::from_millis(
                config.cache_ttl_ms,
            ))),
            llm_timeout: Duration::from_millis(config.llm_classify_timeout_ms),
        }
    }

    /// Classify one message. Never fails; the worst case is the
    /// `NORMAL_QUERY @ 0.3` fallback.
    pub async fn classify_intent(
        &self,
        message: &str,
        context: Option<&[String]>,
    ) -> IntentClassification {
        let normalized = normalize(message);
        let key = CacheKey::new(&normalized, context);

        if let Some(hit) = self.cache.lock().get(&key) {
            tracing::debug!(message = %normalized, "Classification cache hit");
            return hit;
        }

        let keyword = match_keywords(&normalized);
        let mut cacheable = true;

        let mut classification = match keyword {
            Some((intent, confidence)) if confidence >= KEYWORD_SHORT_CIRCUIT => {
                IntentClassification::new(intent, confidence)
            }
            _ => match &self.llm {
                Some(llm) => match self.classify_with_llm(llm, message, context).await {
                    Ok(classification) => classification,
                    Err(e) => {
                        tracing::warn!("LLM classification failed ({}); downgrading", e);
                        cacheable = false;
                        match keyword {
                            Some((intent, confidence)) => {
                                IntentClassification::new(intent, confidence)
                            }
                            None => IntentClassification::fallback(),
                        }
                    }
                },
                None => {
                    cacheable = false;
                    match keyword {
                        Some((intent, confidence)) => IntentClassification::new(intent, confidence),
                        None => IntentClassification::fallback(),
                    }
                }
            },
        };

        // The extractor always runs and only fills gaps.
        classification
            .entities
            .fill_missing_from(extract_entities(&normalized));

        if cacheable && classification.confidence >= CACHE_WRITE_MIN {
            self.cache.lock().insert(key, classification.clone());
        }
        classification
    }

    async fn classify_with_llm(
        &self,
        llm: &Arc<dyn LlmRuntime>,
        message: &str,
        context: Option<&[String]>,
    ) -> Result<IntentClassification> {
        let mut user_content = String::new();
        if let Some(context) = context {
            if !context.is_empty() {
                user_content.push_str("Recent conversation:\n");
                for line in context.iter().rev().take(5).rev() {
                    user_content.push_str(line);
                    user_content.push('\n');
                }
                user_content.push('\n');
            }
        }
        user_content.push_str("Classify this message: ");
        user_content.push_str(message);

        let input = LlmInput {
            messages: vec![
                Message::system(CLASSIFY_SYSTEM_PROMPT),
                Message::user(user_content),
            ],
            params: GenerationParams {
                temperature: Some(0.2),
                max_tokens: Some(400),
                ..Default::default()
            },
            model: None,
            tools: None,
        };

        let output = tokio::time::timeout(self.llm_timeout, llm.generate(input))
            .await
            .map_err(|_| Error::timeout("LLM classification call expired"))??;

        parse_llm_reply(&output.text)
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Drop every cached classification.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

/// Lowercase, trim, collapse whitespace.
fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the LLM reply into a classification.
///
/// Tolerant of Markdown code fences and prose around the JSON object, per
/// how chat models actually answer "reply with strict JSON".
fn parse_llm_reply(text: &str) -> Result<IntentClassification> {
    let stripped = strip_code_fences(text);
    let json = extract_json_object(&stripped)?;
    let reply: LlmReply = serde_json::from_str(json)
        .map_err(|e| Error::parse("llm classification reply", e.to_string()))?;

    let intent = Intent::from_token(&reply.intent)
        .ok_or_else(|| Error::parse("llm classification reply", format!("unknown intent {:?}", reply.intent)))?;
    let confidence = reply.confidence.unwrap_or(0.5).clamp(0.0, 1.0);

    // The explicit diagnostics signal only overrides the derivation when
    // the model is confident.
    let requires_diagnostics = match reply.requires_diagnostics {
        Some(explicit) if confidence >= 0.8 => explicit,
        _ => intent.requires_diagnostics(),
    };

    Ok(IntentClassification {
        intent,
        confidence,
        entities: reply.entities.unwrap_or_default(),
        requires_diagnostics,
        reasoning: reply.reasoning,
    })
}

/// Remove a leading/trailing Markdown code fence, if present.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the info string ("json") on the opening fence line.
        let rest = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
        let rest = rest.trim_end();
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

/// Slice out the first balanced-looking JSON object.
fn extract_json_object(text: &str) -> Result<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| Error::parse("llm classification reply", "no JSON object found"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| Error::parse("llm classification reply", "incomplete JSON object"))?;
    Ok(&text[start..=end])
}
