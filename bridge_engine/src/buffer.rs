//! Pending-call and outbound buffers
//!
//! Both are plain FIFO queues. The pending-call buffer keeps one queue per
//! operation name, so draining a name never scans calls for other names.

use bridge_wire::{CallId, Message, Value};
use std::collections::{HashMap, VecDeque};

/// An inbound call waiting for its handler
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BufferedCall {
    pub id: CallId,
    pub name: String,
    pub args: Vec<Value>,
}

/// Inbound calls for names without a handler, oldest first per name
#[derive(Debug, Default)]
pub(crate) struct PendingCallBuffer {
    by_name: HashMap<String, VecDeque<BufferedCall>>,
}

impl PendingCallBuffer {
    /// Appends a call to the queue for its name
    pub(crate) fn push(&mut self, call: BufferedCall) {
        self.by_name
            .entry(call.name.clone())
            .or_default()
            .push_back(call);
    }

    /// Removes every call buffered under `name`, oldest first
    pub(crate) fn take(&mut self, name: &str) -> VecDeque<BufferedCall> {
        self.by_name.remove(name).unwrap_or_default()
    }

    /// Puts unprocessed calls back ahead of anything buffered since they were taken
    ///
    /// `calls` must be in arrival order; it ends up at the front of the queue
    /// for `name` in that same order.
    pub(crate) fn requeue_front(&mut self, name: &str, mut calls: VecDeque<BufferedCall>) {
        if calls.is_empty() {
            return;
        }
        if let Some(newer) = self.by_name.remove(name) {
            calls.extend(newer);
        }
        self.by_name.insert(name.to_string(), calls);
    }

    /// Returns the number of calls buffered under `name`
    pub(crate) fn len(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, VecDeque::len)
    }

    /// Returns the number of buffered calls across all names
    pub(crate) fn total(&self) -> usize {
        self.by_name.values().map(VecDeque::len).sum()
    }
}

/// Outbound messages held until the handshake completes
#[derive(Debug, Default)]
pub(crate) struct OutboundBuffer {
    messages: VecDeque<Message>,
}

impl OutboundBuffer {
    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Takes every queued message, oldest first, leaving the buffer empty
    pub(crate) fn drain(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }
}
