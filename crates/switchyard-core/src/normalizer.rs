//! Message validation and canonicalization.
//!
//! Everything downstream of [`MessageNormalizer::normalize`] consumes
//! [`NormalizedMessage`] only. Normalization never reorders messages.

use serde_json::Value;
use std::collections::BTreeMap;

use switchyard_types::models::NormalizerConfig;
use switchyard_types::{GatewayError, GatewayResult, NormalizedMessage, RawMessage, Role};

pub struct MessageNormalizer {
    max_total_chars: usize,
    default_system_message: Option<String>,
}

impl MessageNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            max_total_chars: config.max_total_chars,
            default_system_message: config
                .default_system_message
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn max_total_chars(&self) -> usize {
        self.max_total_chars
    }

    /// Validate and canonicalize a client message list.
    ///
    /// The size limit applies to client content; a prepended default system
    /// message does not count against it.
    pub fn normalize(&self, raw_messages: &[RawMessage]) -> GatewayResult<Vec<NormalizedMessage>> {
        self.normalize_with(raw_messages, &BTreeMap::new())
    }

    /// [`normalize`](Self::normalize), then append `enhancements` to the first
    /// system message as an `Additional context:` block of `key: value` lines.
    ///
    /// A system message holding only the block is inserted at the front when
    /// there is none. The block counts against the size limit; `null` values
    /// are skipped.
    pub fn normalize_with(
        &self,
        raw_messages: &[RawMessage],
        enhancements: &BTreeMap<String, Value>,
    ) -> GatewayResult<Vec<NormalizedMessage>> {
        if raw_messages.is_empty() {
            return Err(GatewayError::invalid_input("messages must not be empty"));
        }

        let mut normalized = Vec::with_capacity(raw_messages.len() + 1);
        let mut total_chars = 0usize;

        for (index, raw) in raw_messages.iter().enumerate() {
            let role_name = raw
                .role
                .as_deref()
                .ok_or_else(|| GatewayError::invalid_input(format!("messages[{}]: missing role", index)))?;
            let role = Role::parse(role_name).ok_or_else(|| {
                GatewayError::invalid_input(format!(
                    "messages[{}]: unrecognized role '{}', expected system, user or assistant",
                    index, role_name
                ))
            })?;

            let content = raw
                .content
                .as_ref()
                .ok_or_else(|| GatewayError::invalid_input(format!("messages[{}]: missing content", index)))
                .and_then(|value| extract_text(value, index))?;
            let content = normalize_text(&content);
            if content.is_empty() {
                return Err(GatewayError::invalid_input(format!(
                    "messages[{}]: content is empty",
                    index
                )));
            }

            total_chars += content.chars().count();
            normalized.push(NormalizedMessage { role, content });
        }

        let context = context_block(enhancements)?;
        if let Some(block) = &context {
            total_chars += block.chars().count();
        }

        if total_chars > self.max_total_chars {
            tracing::debug!(total_chars, limit = self.max_total_chars, "Rejected oversized payload");
            return Err(GatewayError::PayloadTooLarge { size: total_chars, limit: self.max_total_chars });
        }

        if let Some(system) = &self.default_system_message {
            if !normalized.iter().any(|m| m.role == Role::System) {
                normalized.insert(0, NormalizedMessage { role: Role::System, content: system.clone() });
            }
        }

        if let Some(block) = context {
            match normalized.iter_mut().find(|m| m.role == Role::System) {
                Some(system) => system.content = format!("{}\n\n{}", system.content, block),
                None => normalized.insert(0, NormalizedMessage { role: Role::System, content: block }),
            }
        }

        Ok(normalized)
    }
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

/// Plain string, or an array of `{"type": "text", "text": ...}` parts joined by newlines.
fn extract_text(value: &Value, index: usize) -> GatewayResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(parts) => {
            let mut texts = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Value::String(s) => texts.push(s.as_str()),
                    Value::Object(obj) => {
                        let kind = obj.get("type").and_then(Value::as_str).unwrap_or("text");
                        if kind != "text" {
                            return Err(GatewayError::invalid_input(format!(
                                "messages[{}]: unsupported content part type '{}'",
                                index, kind
                            )));
                        }
                        match obj.get("text").and_then(Value::as_str) {
                            Some(text) => texts.push(text),
                            None => {
                                return Err(GatewayError::invalid_input(format!(
                                    "messages[{}]: text part without text",
                                    index
                                )))
                            },
                        }
                    },
                    _ => {
                        return Err(GatewayError::invalid_input(format!(
                            "messages[{}]: malformed content part",
                            index
                        )))
                    },
                }
            }
            Ok(texts.join("\n"))
        },
        _ => Err(GatewayError::invalid_input(format!(
            "messages[{}]: content must be a string or an array of text parts",
            index
        ))),
    }
}

fn context_block(enhancements: &BTreeMap<String, Value>) -> GatewayResult<Option<String>> {
    let mut lines = Vec::with_capacity(enhancements.len());
    for (key, value) in enhancements {
        let key = key.trim();
        if key.is_empty() {
            return Err(GatewayError::invalid_input("enhancement keys must not be empty"));
        }
        let value = match value {
            Value::Null => continue,
            Value::String(s) => normalize_text(s),
            other => other.to_string(),
        };
        lines.push(format!("{}: {}", key, value));
    }

    if lines.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("Additional context:\n{}", lines.join("\n"))))
}

/// Unify line endings, then trim.
fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
