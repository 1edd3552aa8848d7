//! Simulated embedding host.
//!
//! In production the host sits between the two sides: it receives the
//! initiator's `{ pluginMessage, pluginId }` posts and hands the bare message
//! to the responder, and it wraps whatever the responder posts before the
//! initiator's listener sees it. `SimHost` does the same with two
//! [`MemoryChannel`]s, and nothing moves until the test asks it to.

use bridge_wire::PluginEnvelope;
use serde_json::Value;

use crate::MemoryChannel;

/// In-process stand-in for the embedding host
#[derive(Debug, Clone, Default)]
pub struct SimHost {
    /// Posts made by the initiator side
    initiator_outbox: MemoryChannel,
    /// Posts made by the responder side
    responder_outbox: MemoryChannel,
    /// Plugin the host is running, when traffic is restricted
    plugin_id: Option<String>,
}

impl SimHost {
    /// Creates a host that forwards all initiator traffic
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host that only forwards initiator traffic addressed to `plugin_id`
    pub fn restricted(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: Some(plugin_id.into()),
            ..Self::default()
        }
    }

    /// Channel to hand to the initiator engine
    pub fn initiator_channel(&self) -> MemoryChannel {
        self.initiator_outbox.clone()
    }

    /// Channel to hand to the responder engine
    pub fn responder_channel(&self) -> MemoryChannel {
        self.responder_outbox.clone()
    }

    /// Takes pending initiator posts as the responder's listener sees them
    pub fn deliveries_to_responder(&self) -> Vec<Value> {
        self.initiator_outbox
            .drain()
            .into_iter()
            .filter_map(|posted| {
                let envelope: PluginEnvelope = serde_json::from_value(posted.data).ok()?;
                if let Some(expected) = &self.plugin_id {
                    if envelope.plugin_id.as_ref() != Some(expected) {
                        return None;
                    }
                }
                Some(envelope.message)
            })
            .collect()
    }

    /// Takes pending responder posts as the initiator's listener sees them
    pub fn deliveries_to_initiator(&self) -> Vec<Value> {
        self.responder_outbox
            .drain()
            .into_iter()
            .map(|posted| PluginEnvelope::wrap(posted.data).to_value())
            .collect()
    }

    /// Checks if neither side has traffic waiting
    pub fn is_idle(&self) -> bool {
        self.initiator_outbox.is_empty() && self.responder_outbox.is_empty()
    }
}
