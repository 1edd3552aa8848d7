//! Message types and call identifiers

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier correlating a call with its terminal reply
///
/// Allocated from a per-engine counter that starts at zero and only moves
/// forward, so an id is never reused while the call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// The first id an engine hands out
    pub const FIRST: CallId = CallId(0);

    /// Creates a call ID from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the current id and moves the counter to the next one
    pub fn advance(&mut self) -> CallId {
        let current = *self;
        self.0 += 1;
        current
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call({})", self.0)
    }
}

/// Discriminant of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Call,
    Response,
    Error,
    Connect,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Call => write!(f, "call"),
            MessageKind::Response => write!(f, "response"),
            MessageKind::Error => write!(f, "error"),
            MessageKind::Connect => write!(f, "connect"),
        }
    }
}

/// A protocol message
///
/// On the wire this is a JSON object discriminated by its `type` field.
/// Arguments and results travel under `data`; the error description travels
/// as a JSON-encoded string under `errorJSON`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Request to invoke `name` with the ordered `args`
    Call {
        id: CallId,
        name: String,
        #[serde(rename = "data")]
        args: Vec<Value>,
    },
    /// Successful outcome of the call with the same `id`
    Response {
        id: CallId,
        name: String,
        #[serde(rename = "data", default)]
        result: Value,
    },
    /// Failed outcome of the call with the same `id`
    Error {
        id: CallId,
        name: String,
        #[serde(rename = "errorJSON")]
        error_json: String,
    },
    /// "I am ready to receive messages"
    Connect,
}

impl Message {
    /// Parses inbound data, returning `None` for anything that is not a
    /// well-formed message of a known kind
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Converts the message into its wire representation
    pub fn to_value(&self) -> Value {
        // Every variant is a plain struct of strings, integers and values.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Returns the message discriminant
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Call { .. } => MessageKind::Call,
            Message::Response { .. } => MessageKind::Response,
            Message::Error { .. } => MessageKind::Error,
            Message::Connect => MessageKind::Connect,
        }
    }

    /// Returns the correlation id, if this kind carries one
    pub fn id(&self) -> Option<CallId> {
        match self {
            Message::Call { id, .. } | Message::Response { id, .. } | Message::Error { id, .. } => {
                Some(*id)
            }
            Message::Connect => None,
        }
    }

    /// Returns the operation name, if this kind carries one
    pub fn name(&self) -> Option<&str> {
        match self {
            Message::Call { name, .. }
            | Message::Response { name, .. }
            | Message::Error { name, .. } => Some(name),
            Message::Connect => None,
        }
    }
}
