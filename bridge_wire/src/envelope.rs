//! Initiator-side envelope
//!
//! The initiator does not post bare messages. Its traffic goes through the
//! embedding host, which expects `{ pluginMessage, pluginId? }` and hands the
//! inner message to the responder. The same wrapper comes back the other way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Message;

/// Wrapper around a message travelling through the embedding host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEnvelope {
    /// The wrapped protocol message
    #[serde(rename = "pluginMessage")]
    pub message: Value,
    /// Plugin the message is addressed to, when origins are restricted
    #[serde(rename = "pluginId", default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
}

impl PluginEnvelope {
    /// Wraps a message
    pub fn new(message: &Message) -> Self {
        Self::wrap(message.to_value())
    }

    /// Wraps data that is already in wire form
    pub fn wrap(message: Value) -> Self {
        Self {
            message,
            plugin_id: None,
        }
    }

    /// Addresses the envelope to a plugin
    pub fn with_plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    /// Converts the envelope into its wire representation
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Extracts the wrapped message from inbound event data
    ///
    /// Returns `None` unless `data` is an object whose `pluginMessage` is itself
    /// an object. Other traffic sharing the channel is ignored.
    pub fn open(data: Value) -> Option<Value> {
        match data {
            Value::Object(mut fields) => match fields.remove("pluginMessage") {
                Some(inner @ Value::Object(_)) => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }
}
