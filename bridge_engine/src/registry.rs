//! Call and receiver registries

use bridge_wire::{CallId, Value};
use deferred::Settler;
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{CallError, HandlerError};

/// Future produced by a registered handler
pub type HandlerFuture = LocalBoxFuture<'static, Result<Value, HandlerError>>;

/// Type-erased handler, shared so it can be invoked without holding a borrow
pub(crate) type Handler = Rc<dyn Fn(Vec<Value>) -> HandlerFuture>;

/// Outstanding calls by id
///
/// Entries are removed when their terminal message is processed, so the
/// registry only ever holds calls that are still waiting.
#[derive(Default)]
pub(crate) struct CallRegistry {
    pending: HashMap<CallId, Settler<Value, CallError>>,
}

impl CallRegistry {
    pub(crate) fn insert(&mut self, id: CallId, settler: Settler<Value, CallError>) {
        self.pending.insert(id, settler);
    }

    /// Removes and returns the settler for `id`
    pub(crate) fn take(&mut self, id: CallId) -> Option<Settler<Value, CallError>> {
        self.pending.remove(&id)
    }

    pub(crate) fn contains(&self, id: CallId) -> bool {
        self.pending.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Local handlers by operation name, at most one per name
#[derive(Default)]
pub(crate) struct ReceiverRegistry {
    receivers: HashMap<String, Handler>,
}

impl ReceiverRegistry {
    /// Registers a handler. Returns whether an existing one was replaced.
    pub(crate) fn insert(&mut self, name: String, handler: Handler) -> bool {
        self.receivers.insert(name, handler).is_some()
    }

    /// Unregisters a handler. Returns whether one was registered.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.receivers.remove(name).is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Handler> {
        self.receivers.get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.receivers.contains_key(name)
    }
}
