//! Transport adapter
//!
//! Applies the role-specific framing and the configured post options to every
//! physical post, and undoes the framing on inbound data. Buffering before the
//! handshake is engine state and lives in the engine, not here.

use bridge_transport::{BridgeConfig, Channel, PostOptions, Role, TransportError};
use bridge_wire::{Message, PluginEnvelope, Value};

/// Role-aware wrapper around the physical channel
pub(crate) struct TransportAdapter {
    role: Role,
    options: PostOptions,
    channel: Box<dyn Channel>,
}

impl TransportAdapter {
    /// Creates an adapter for the given configuration
    pub(crate) fn new(config: &BridgeConfig, channel: Box<dyn Channel>) -> Self {
        Self {
            role: config.role,
            options: config.post_options(),
            channel,
        }
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Posts a message through the physical channel
    ///
    /// The initiator's traffic goes out inside a `pluginMessage` envelope,
    /// addressed to the configured plugin when restricted.
    pub(crate) fn send(&self, message: &Message) -> Result<(), TransportError> {
        let data = match self.role {
            Role::Initiator => {
                let mut envelope = PluginEnvelope::new(message);
                envelope.plugin_id = self.options.plugin_id.clone();
                envelope.to_value()
            }
            Role::Responder => message.to_value(),
        };
        self.channel.post(data, &self.options)
    }

    /// Extracts the protocol message from inbound listener data
    pub(crate) fn open(&self, data: Value) -> Option<Value> {
        match self.role {
            Role::Initiator => PluginEnvelope::open(data),
            Role::Responder => Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_transport::{InitiationOptions, MemoryChannel, DEFAULT_TARGET_ORIGIN};
    use bridge_wire::CallId;
    use serde_json::json;

    fn call() -> Message {
        Message::Call {
            id: CallId::new(0),
            name: "add".to_string(),
            args: vec![json!(2), json!(3)],
        }
    }

    #[test]
    fn test_initiator_wraps_and_addresses() {
        let channel = MemoryChannel::new();
        let config = BridgeConfig::initiator(InitiationOptions::restricted("p1", "https://host"));
        let adapter = TransportAdapter::new(&config, Box::new(channel.clone()));

        adapter.send(&call()).unwrap();

        let posted = channel.pop().unwrap();
        assert_eq!(
            posted.data,
            json!({
                "pluginMessage": {"type": "call", "id": 0, "name": "add", "data": [2, 3]},
                "pluginId": "p1"
            })
        );
        assert_eq!(posted.options.target_origin, DEFAULT_TARGET_ORIGIN);
    }

    #[test]
    fn test_unrestricted_initiator_omits_plugin_id() {
        let channel = MemoryChannel::new();
        let config = BridgeConfig::initiator(InitiationOptions::unrestricted());
        let adapter = TransportAdapter::new(&config, Box::new(channel.clone()));

        adapter.send(&Message::Connect).unwrap();
        assert_eq!(
            channel.pop().unwrap().data,
            json!({"pluginMessage": {"type": "connect"}})
        );
    }

    #[test]
    fn test_responder_posts_bare_message() {
        let channel = MemoryChannel::new();
        let config = BridgeConfig::responder(InitiationOptions::restricted("p1", "https://host"));
        let adapter = TransportAdapter::new(&config, Box::new(channel.clone()));

        adapter.send(&call()).unwrap();

        let posted = channel.pop().unwrap();
        assert_eq!(posted.data, call().to_value());
        assert_eq!(posted.options.origin.as_deref(), Some("https://host"));
        assert_eq!(adapter.role(), Role::Responder);
    }

    #[test]
    fn test_open_per_role() {
        let initiator = TransportAdapter::new(
            &BridgeConfig::initiator(InitiationOptions::unrestricted()),
            Box::new(MemoryChannel::new()),
        );
        assert_eq!(
            initiator.open(json!({"pluginMessage": {"type": "connect"}})),
            Some(json!({"type": "connect"}))
        );
        assert_eq!(initiator.open(json!({"type": "connect"})), None);

        let responder = TransportAdapter::new(
            &BridgeConfig::responder(InitiationOptions::unrestricted()),
            Box::new(MemoryChannel::new()),
        );
        assert_eq!(
            responder.open(json!({"type": "connect"})),
            Some(json!({"type": "connect"}))
        );
    }

    #[test]
    fn test_send_reports_closed_channel() {
        let channel = MemoryChannel::new();
        channel.close();
        let adapter = TransportAdapter::new(
            &BridgeConfig::responder(InitiationOptions::unrestricted()),
            Box::new(channel),
        );
        assert_eq!(adapter.send(&Message::Connect), Err(TransportError::Closed));
    }
}
