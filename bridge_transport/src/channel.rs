//! The physical post primitive

use serde_json::Value;
use thiserror::Error;

use crate::PostOptions;

/// Errors raised by a physical channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The channel no longer accepts traffic
    #[error("Channel closed")]
    Closed,

    /// The host refused the post
    #[error("Post rejected: {0}")]
    Rejected(String),
}

/// Sends one serializable value to the other side
///
/// Implementations wrap whatever the host offers (a `postMessage`-style call,
/// a pipe, an in-process queue). Inbound traffic is not part of this trait:
/// the host hands received data to the engine directly.
pub trait Channel {
    fn post(&self, data: Value, options: &PostOptions) -> Result<(), TransportError>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn post(&self, data: Value, options: &PostOptions) -> Result<(), TransportError> {
        (**self).post(data, options)
    }
}

impl<C: Channel + ?Sized> Channel for std::rc::Rc<C> {
    fn post(&self, data: Value, options: &PostOptions) -> Result<(), TransportError> {
        (**self).post(data, options)
    }
}
