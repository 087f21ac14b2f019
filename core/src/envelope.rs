//! The normalized response envelope shared by client and server.
//!
//! # Design
//! An envelope is `{ success, messages, data, info }` on the wire and nothing
//! else. `data` and `info` are open JSON maps so either side can merge
//! arbitrary payloads into them. Messages are normalized on insertion: a
//! message without display text gets the stringified code, so every stored
//! message can be shown to a user as-is.
//!
//! Mutators come in two flavours. `set_success` / `add_message` /
//! `merge_data` / `merge_info` work through `&mut self` and return the same
//! reference, which is what a server handler holding `&mut ResponseEnvelope`
//! needs. The `with_*` builders take and return the envelope by value for
//! fluent construction.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ApiError;

/// Machine-readable message code. Either a string (`"NOT_FOUND"`) or a
/// number (`404`), exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageCode {
    Text(String),
    Number(Number),
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageCode::Text(text) => f.write_str(text),
            MessageCode::Number(number) => {
                // Whole floats below 1e21 render as plain digits (`4.0` -> `4`,
                // `1e16` -> `10000000000000000`).
                match number.as_f64() {
                    Some(value) if number.is_f64() && value == 0.0 => f.write_str("0"),
                    Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e21 => {
                        write!(f, "{value}")
                    }
                    _ => write!(f, "{number}"),
                }
            }
        }
    }
}

impl From<&str> for MessageCode {
    fn from(code: &str) -> Self {
        MessageCode::Text(code.to_string())
    }
}

impl From<String> for MessageCode {
    fn from(code: String) -> Self {
        MessageCode::Text(code)
    }
}

impl From<i64> for MessageCode {
    fn from(code: i64) -> Self {
        MessageCode::Number(code.into())
    }
}

impl From<i32> for MessageCode {
    fn from(code: i32) -> Self {
        MessageCode::Number(code.into())
    }
}

impl From<u16> for MessageCode {
    fn from(code: u16) -> Self {
        MessageCode::Number(code.into())
    }
}

/// A single coded message attached to an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub code: MessageCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Message {
    /// A message with only a code. Its display text is filled in when it is
    /// added to an envelope.
    pub fn new(code: impl Into<MessageCode>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }

    pub fn with_text(code: impl Into<MessageCode>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: Some(text.into()),
        }
    }

    /// Display text, falling back to the code.
    pub fn text(&self) -> String {
        match &self.message {
            Some(text) => text.clone(),
            None => self.code.to_string(),
        }
    }

    fn normalized(mut self) -> Self {
        if self.message.is_none() {
            self.message = Some(self.code.to_string());
        }
        self
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        let code = match &self.code {
            MessageCode::Text(text) => Value::String(text.clone()),
            MessageCode::Number(number) => Value::Number(number.clone()),
        };
        object.insert("code".to_string(), code);
        if let Some(text) = &self.message {
            object.insert("message".to_string(), Value::String(text.clone()));
        }
        Value::Object(object)
    }
}

/// Normalized result of an API call.
///
/// Constructed fresh per request/response cycle. `success == true` means the
/// call completed without error; informational messages may still be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EnvelopeSeed")]
pub struct ResponseEnvelope {
    success: bool,
    messages: Vec<Message>,
    data: Map<String, Value>,
    info: Map<String, Value>,
}

/// Wire shape accepted when seeding an envelope from a remote one. `null`
/// and missing fields both fall back to the defaults.
#[derive(Deserialize)]
struct EnvelopeSeed {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    info: Option<Map<String, Value>>,
}

impl From<EnvelopeSeed> for ResponseEnvelope {
    fn from(seed: EnvelopeSeed) -> Self {
        Self {
            success: seed.success.unwrap_or_default(),
            messages: seed
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(Message::normalized)
                .collect(),
            data: seed.data.unwrap_or_default(),
            info: seed.info.unwrap_or_default(),
        }
    }
}

impl ResponseEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an envelope from a parsed remote response.
    ///
    /// Anything other than a JSON object yields a default (unsuccessful)
    /// envelope. An object whose fields have the wrong shape is rejected.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn info(&self) -> &Map<String, Value> {
        &self.info
    }

    /// Deserialize the `data` bag into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Deserialize the `info` bag into a typed value.
    pub fn info_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.info.clone()))
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn set_success(&mut self) -> &mut Self {
        self.success = true;
        self
    }

    /// Append a message, defaulting its text to the stringified code.
    pub fn add_message(&mut self, message: Message) -> &mut Self {
        self.messages.push(message.normalized());
        self
    }

    /// Shallow-merge `object` into `data`; incoming keys win. Values that do
    /// not serialize to a JSON object contribute no keys.
    pub fn merge_data(&mut self, object: impl Serialize) -> &mut Self {
        merge_into(&mut self.data, object);
        self
    }

    /// Shallow-merge `object` into `info`; incoming keys win.
    pub fn merge_info(&mut self, object: impl Serialize) -> &mut Self {
        merge_into(&mut self.info, object);
        self
    }

    pub fn with_success(mut self) -> Self {
        self.set_success();
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.add_message(message);
        self
    }

    pub fn with_data(mut self, object: impl Serialize) -> Self {
        self.merge_data(object);
        self
    }

    pub fn with_info(mut self, object: impl Serialize) -> Self {
        self.merge_info(object);
        self
    }

    /// The wire form: exactly `success`, `messages`, `data` and `info`.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("success".to_string(), Value::Bool(self.success));
        object.insert(
            "messages".to_string(),
            Value::Array(self.messages.iter().map(Message::to_value).collect()),
        );
        object.insert("data".to_string(), Value::Object(self.data.clone()));
        object.insert("info".to_string(), Value::Object(self.info.clone()));
        Value::Object(object)
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

fn merge_into(target: &mut Map<String, Value>, object: impl Serialize) {
    if let Ok(Value::Object(source)) = serde_json::to_value(object) {
        for (key, value) in source {
            target.insert(key, value);
        }
    }
}
