//! Wire types for the external chat service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Optional request fields applied to every outbound message.
///
/// Unset fields are omitted from the JSON body so the service falls back to
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    /// Access role the service should answer as (e.g. `viewer`, `analyst`).
    #[serde(default)]
    pub role: Option<String>,
    /// Number of retrieved chunks the service should use.
    #[serde(default)]
    pub top_k: Option<u32>,
    /// Model name forwarded to the service.
    #[serde(default)]
    pub model: Option<String>,
    /// Answering mode (`rag` or `agent`).
    #[serde(default)]
    pub mode: Option<String>,
}

/// Request body sent to the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Only sent when diagnostics are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ChatRequest {
    /// Build a request for `message` with the given defaults.
    pub fn new(message: impl Into<String>, debug: bool, defaults: &RequestDefaults) -> Self {
        Self {
            message: message.into(),
            debug: debug.then_some(true),
            role: defaults.role.clone(),
            top_k: defaults.top_k,
            model: defaults.model.clone(),
            mode: defaults.mode.clone(),
        }
    }
}

/// A suggested action or navigation target returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// Response body returned by the chat service.
///
/// Only `answer` drives rendering. The other fields are kept as diagnostics.
/// `answer` is optional here so a body without it still parses and the
/// caller can decide how to treat the gap. Extras never fail a parse: a
/// `null` or wrongly shaped field reads as empty and unusable list items
/// are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub sources: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_actions: Vec<ActionItem>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub navigation: Vec<ActionItem>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub used: Map<String, Value>,
}

/// Items of a JSON array that parse as `T`; anything else is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A JSON object, or empty for anything else.
fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

impl ChatResponse {
    /// Response carrying only an answer.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    /// Everything except `answer`, or `None` when the service sent no extras.
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        let diagnostics = Diagnostics {
            sources: self.sources.clone(),
            suggested_actions: self.suggested_actions.clone(),
            navigation: self.navigation.clone(),
            used: self.used.clone(),
        };
        (!diagnostics.is_empty()).then_some(diagnostics)
    }
}

/// Non-answer fields of a response, surfaced when debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub sources: Vec<Value>,
    pub suggested_actions: Vec<ActionItem>,
    pub navigation: Vec<ActionItem>,
    pub used: Map<String, Value>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.suggested_actions.is_empty()
            && self.navigation.is_empty()
            && self.used.is_empty()
    }
}
