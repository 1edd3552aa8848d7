//! Error payloads carried by `error` messages

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serialized description of a failed call
///
/// The textual `message` plus every other field the failure carried. On the
/// wire it is a JSON object encoded into a string, so a peer can send text
/// that is a valid message envelope but an undecodable payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Failure message text
    #[serde(default)]
    pub message: String,
    /// Auxiliary fields (error name, stack, codes, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ErrorPayload {
    /// Creates a payload with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Adds an auxiliary field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Encodes the payload into the string carried under `errorJSON`
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes an `errorJSON` string
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Splits the payload into its message and the remaining fields
    pub fn into_parts(self) -> (String, Map<String, Value>) {
        (self.message, self.fields)
    }
}
