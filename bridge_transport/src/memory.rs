//! In-process channel.
//!
//! Records every post in FIFO order so a test or a simulated host can pick
//! the traffic up later.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{Channel, PostOptions, TransportError};

/// One recorded post
#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub data: Value,
    pub options: PostOptions,
}

#[derive(Debug, Default)]
struct Outbox {
    closed: bool,
    posted: VecDeque<Posted>,
}

/// Channel that queues posts in memory
///
/// Clones share the same queue, so one clone can be handed to an engine
/// while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    outbox: Rc<RefCell<Outbox>>,
}

impl MemoryChannel {
    /// Creates an open, empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued posts
    pub fn len(&self) -> usize {
        self.outbox.borrow().posted.len()
    }

    /// Returns whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.outbox.borrow().posted.is_empty()
    }

    /// Pops the oldest post
    pub fn pop(&self) -> Option<Posted> {
        self.outbox.borrow_mut().posted.pop_front()
    }

    /// Takes every queued post, oldest first
    pub fn drain(&self) -> Vec<Posted> {
        self.outbox.borrow_mut().posted.drain(..).collect()
    }

    /// Returns a copy of the queued data without consuming it
    pub fn peek_data(&self) -> Vec<Value> {
        self.outbox
            .borrow()
            .posted
            .iter()
            .map(|posted| posted.data.clone())
            .collect()
    }

    /// Stops accepting posts
    pub fn close(&self) {
        self.outbox.borrow_mut().closed = true;
    }

    /// Checks if the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.outbox.borrow().closed
    }
}

impl Channel for MemoryChannel {
    fn post(&self, data: Value, options: &PostOptions) -> Result<(), TransportError> {
        let mut outbox = self.outbox.borrow_mut();
        if outbox.closed {
            return Err(TransportError::Closed);
        }
        outbox.posted.push_back(Posted {
            data,
            options: options.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_ordering() {
        let channel = MemoryChannel::new();
        let options = PostOptions::default();
        channel.post(json!("a"), &options).unwrap();
        channel.post(json!("b"), &options).unwrap();
        channel.post(json!("c"), &options).unwrap();

        assert_eq!(channel.len(), 3);
        assert_eq!(channel.pop().unwrap().data, json!("a"));
        let rest: Vec<Value> = channel.drain().into_iter().map(|p| p.data).collect();
        assert_eq!(rest, vec![json!("b"), json!("c")]);
        assert!(channel.is_empty());
        assert!(channel.pop().is_none());
    }

    #[test]
    fn test_clones_share_queue() {
        let channel = MemoryChannel::new();
        let handle = channel.clone();
        channel.post(json!(1), &PostOptions::default()).unwrap();
        assert_eq!(handle.peek_data(), vec![json!(1)]);
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn test_post_records_options() {
        let channel = MemoryChannel::new();
        let options = PostOptions {
            target_origin: "https://t".to_string(),
            origin: None,
            plugin_id: Some("p".to_string()),
        };
        channel.post(json!({}), &options).unwrap();
        assert_eq!(channel.pop().unwrap().options, options);
    }

    #[test]
    fn test_closed_channel_rejects() {
        let channel = MemoryChannel::new();
        channel.close();
        assert!(channel.is_closed());
        assert_eq!(
            channel.post(json!(1), &PostOptions::default()),
            Err(TransportError::Closed)
        );
        assert!(channel.is_empty());
    }
}
