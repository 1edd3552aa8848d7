//! Engine error types

use bridge_transport::TransportError;
use bridge_wire::{ErrorPayload, Map, Value};
use thiserror::Error;

/// Errors returned synchronously by engine operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// No transport has been installed yet
    #[error("You must call initiate() before calling any other functions.")]
    NotInitialized,

    /// A transport is already installed on this engine
    #[error("Bridge already initiated")]
    AlreadyInitialized,

    /// The physical channel refused the message
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failure delivered through the future returned by `call`
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// The remote handler failed
    ///
    /// `cause` holds every field of the remote failure other than its message.
    #[error("{message}")]
    Remote {
        message: String,
        cause: Map<String, Value>,
    },

    /// The peer answered with an error payload that could not be decoded
    #[error("Malformed error payload from peer: {0}")]
    MalformedPayload(String),

    /// The result did not have the requested shape
    #[error("Failed to decode result: {0}")]
    Decode(String),
}

impl CallError {
    /// Returns the failure message text
    pub fn message(&self) -> String {
        match self {
            CallError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the remote cause data, if any
    pub fn cause(&self) -> Option<&Map<String, Value>> {
        match self {
            CallError::Remote { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Rebuilds the failure from a peer's `errorJSON`
    pub(crate) fn from_error_json(text: &str) -> Self {
        match ErrorPayload::decode(text) {
            Ok(payload) => {
                let (message, cause) = payload.into_parts();
                CallError::Remote { message, cause }
            }
            Err(err) => CallError::MalformedPayload(err.to_string()),
        }
    }
}

/// Failure returned by a local handler
///
/// Converted into an `error` message for the caller; it never escapes the
/// engine.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub fields: Map<String, Value>,
}

impl HandlerError {
    /// Creates a handler error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Adds an auxiliary field sent along with the message
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Converts into the payload sent to the caller
    pub fn into_payload(mut self) -> ErrorPayload {
        // The message travels in its own field
        self.fields.remove("message");
        ErrorPayload {
            message: self.message,
            fields: self.fields,
        }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string()).with_field("name", "SerializationError")
    }
}
