//! The protocol engine
//!
//! One [`Bridge`] owns everything a channel needs: outstanding calls, local
//! handlers, calls waiting for a handler, traffic waiting for the handshake,
//! and the connection flag. Clones are handles to the same engine.

use bridge_transport::{BridgeConfig, Channel, EndpointId, Role};
use bridge_wire::{CallId, ErrorPayload, Message, Value};
use deferred::{Deferred, Settler};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, info, trace, warn};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::adapter::TransportAdapter;
use crate::buffer::{BufferedCall, OutboundBuffer, PendingCallBuffer};
use crate::registry::{CallRegistry, Handler, HandlerFuture, ReceiverRegistry};
use crate::runtime;
use crate::{BridgeError, CallError, HandlerError};

/// Work left over after routing an inbound call: run the handler, then reply
type Reply = LocalBoxFuture<'static, ()>;

struct BridgeState {
    endpoint: EndpointId,
    adapter: Option<Rc<TransportAdapter>>,
    next_id: CallId,
    calls: CallRegistry,
    receivers: ReceiverRegistry,
    pending: PendingCallBuffer,
    outbound: OutboundBuffer,
    connected: bool,
}

/// Bidirectional RPC engine for one channel
///
/// Borrows of the shared state never outlive a single step: handlers,
/// settlements and physical posts all run with the state released, so a
/// channel that calls straight back into the engine is fine.
#[derive(Clone)]
pub struct Bridge {
    state: Rc<RefCell<BridgeState>>,
}

impl Bridge {
    /// Creates a new engine with no transport installed
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BridgeState {
                endpoint: EndpointId::new(),
                adapter: None,
                next_id: CallId::FIRST,
                calls: CallRegistry::default(),
                receivers: ReceiverRegistry::default(),
                pending: PendingCallBuffer::default(),
                outbound: OutboundBuffer::default(),
                connected: false,
            })),
        }
    }

    /// Installs the transport
    ///
    /// An initiator announces itself with `connect` straight away; a responder
    /// waits for the peer's `connect` before anything it sends leaves.
    pub fn initiate<C>(&self, config: BridgeConfig, channel: C) -> Result<(), BridgeError>
    where
        C: Channel + 'static,
    {
        let adapter = Rc::new(TransportAdapter::new(&config, Box::new(channel)));
        let endpoint = {
            let mut state = self.state.borrow_mut();
            if state.adapter.is_some() {
                return Err(BridgeError::AlreadyInitialized);
            }
            state.adapter = Some(Rc::clone(&adapter));
            state.endpoint
        };

        info!(
            "{} initiated as {} ({:?})",
            endpoint,
            config.role.name(),
            config.options.origin_type()
        );

        if config.role.sends_connect() {
            adapter.send(&Message::Connect)?;
        }
        Ok(())
    }

    /// Invokes `name` on the peer
    ///
    /// Returns immediately. The returned future settles when the peer's reply
    /// for this call arrives, and stays pending if it never does.
    pub fn call(
        &self,
        name: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Deferred<Value, CallError>, BridgeError> {
        let name = name.into();
        let (endpoint, id, deferred) = {
            let mut state = self.state.borrow_mut();
            if state.adapter.is_none() {
                return Err(BridgeError::NotInitialized);
            }
            let id = state.next_id.advance();
            let settler = Settler::new();
            let deferred = settler.deferred();
            state.calls.insert(id, settler);
            (state.endpoint, id, deferred)
        };

        debug!("{} {} -> {}", endpoint, id, name);

        if let Err(err) = self.post(Message::Call { id, name, args }) {
            self.state.borrow_mut().calls.take(id);
            return Err(err);
        }
        Ok(deferred)
    }

    /// Invokes `name` on the peer and decodes the result into `T`
    pub fn call_as<T>(
        &self,
        name: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<impl Future<Output = Result<T, CallError>>, BridgeError>
    where
        T: DeserializeOwned,
    {
        let deferred = self.call(name, args)?;
        Ok(async move {
            let value = deferred.await?;
            serde_json::from_value(value).map_err(|err| CallError::Decode(err.to_string()))
        })
    }

    /// Registers the handler for `name`, replacing any previous one
    ///
    /// Calls that arrived before the handler existed are replayed in arrival
    /// order on a later scheduler turn, never inside this call.
    ///
    /// A handler reports failure by returning `Err`. A panic is caught and
    /// answered with an `error` reply the same way.
    ///
    /// # Executor
    ///
    /// The replay is a local task, so on native targets it needs a
    /// `tokio::task::LocalSet`. Without one nothing is replayed: the calls
    /// stay buffered and a warning is logged. The next `receive` for `name`
    /// made inside a `LocalSet` replays them.
    pub fn receive<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + 'static,
    {
        let name = name.into();
        let handler: Handler = Rc::new(move |args: Vec<Value>| -> HandlerFuture {
            handler(args).boxed_local()
        });

        let (endpoint, replaced, buffered) = {
            let mut state = self.state.borrow_mut();
            let replaced = state.receivers.insert(name.clone(), handler);
            (state.endpoint, replaced, state.pending.len(&name))
        };

        debug!(
            "{} receiving {}{}",
            endpoint,
            name,
            if replaced { " (replaced)" } else { "" }
        );

        if buffered > 0 {
            let bridge = self.clone();
            let target = name.clone();
            if let Err(err) = runtime::spawn_local(async move { bridge.drain(target).await }) {
                warn!(
                    "{} {} call(s) for {} stay buffered: {}",
                    endpoint, buffered, name, err
                );
            }
        }
    }

    /// Unregisters the handler for `name`
    ///
    /// Calls already buffered under `name` stay buffered.
    pub fn ignore(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if state.receivers.remove(name) {
            debug!("{} ignoring {}", state.endpoint, name);
        }
    }

    /// Hands inbound listener data to the engine
    ///
    /// Handler completion and the reply run as a spawned local task. Foreign
    /// or malformed data is dropped.
    ///
    /// # Executor
    ///
    /// On native targets a call with a registered handler needs a
    /// `tokio::task::LocalSet` to run in. Without one the call is buffered
    /// under its name with a warning, and the next `receive` for that name
    /// replays it. Use [`handle_inbound`](Self::handle_inbound) to run the
    /// handler without spawning.
    pub fn deliver(&self, data: Value) -> Result<(), BridgeError> {
        let call = match self.route(data)? {
            Some(call) => call,
            None => return Ok(()),
        };
        if !self.has_receiver(&call.name) {
            self.buffer(call);
            return Ok(());
        }

        let retained = call.clone();
        let bridge = self.clone();
        if let Err(err) = runtime::spawn_local(async move { bridge.dispatch(call).await }) {
            warn!(
                "{} buffered {} for {}: {}",
                self.endpoint(),
                retained.id,
                retained.name,
                err
            );
            self.state.borrow_mut().pending.push(retained);
        }
        Ok(())
    }

    /// Hands inbound listener data to the engine and waits for any reply
    pub async fn handle_inbound(&self, data: Value) -> Result<(), BridgeError> {
        if let Some(call) = self.route(data)? {
            self.dispatch(call).await;
        }
        Ok(())
    }

    /// Checks if a transport is installed
    pub fn is_initialized(&self) -> bool {
        self.state.borrow().adapter.is_some()
    }

    /// Checks if the peer's `connect` has been processed
    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Returns the configured role, if initiated
    pub fn role(&self) -> Option<Role> {
        self.state.borrow().adapter.as_ref().map(|adapter| adapter.role())
    }

    /// Returns the number of calls still waiting for a reply
    pub fn outstanding_calls(&self) -> usize {
        self.state.borrow().calls.len()
    }

    /// Checks if the call is still waiting for a reply
    pub fn is_outstanding(&self, id: CallId) -> bool {
        self.state.borrow().calls.contains(id)
    }

    /// Returns the number of inbound calls buffered under `name`
    pub fn buffered_calls(&self, name: &str) -> usize {
        self.state.borrow().pending.len(name)
    }

    /// Returns the number of inbound calls buffered across all names
    pub fn total_buffered_calls(&self) -> usize {
        self.state.borrow().pending.total()
    }

    /// Checks if a handler is registered for `name`
    pub fn has_receiver(&self, name: &str) -> bool {
        self.state.borrow().receivers.contains(name)
    }

    /// Returns the number of messages waiting for the handshake
    pub fn queued_outbound(&self) -> usize {
        self.state.borrow().outbound.len()
    }

    /// Returns this engine's identity
    pub fn endpoint(&self) -> EndpointId {
        self.state.borrow().endpoint
    }

    /// Sends a message, or queues it if this role must wait for the handshake
    fn post(&self, message: Message) -> Result<(), BridgeError> {
        let adapter = {
            let mut state = self.state.borrow_mut();
            let adapter = state
                .adapter
                .clone()
                .ok_or(BridgeError::NotInitialized)?;
            if adapter.role().buffers_until_connected() && !state.connected {
                trace!("{} queued {} until connected", state.endpoint, message.kind());
                state.outbound.push(message);
                return Ok(());
            }
            adapter
        };
        adapter.send(&message)?;
        Ok(())
    }

    /// Parses inbound data and dispatches it by kind
    ///
    /// Inbound calls are handed back to the caller, which decides whether the
    /// handler runs inline or as a spawned task.
    fn route(&self, data: Value) -> Result<Option<BufferedCall>, BridgeError> {
        let (endpoint, adapter) = {
            let state = self.state.borrow();
            let adapter = state
                .adapter
                .clone()
                .ok_or(BridgeError::NotInitialized)?;
            (state.endpoint, adapter)
        };

        let message = match adapter.open(data).and_then(Message::from_value) {
            Some(message) => message,
            None => {
                warn!("{} dropped unrecognized inbound data", endpoint);
                return Ok(None);
            }
        };

        trace!("{} received {}", endpoint, message.kind());

        match message {
            Message::Call { id, name, args } => Ok(Some(BufferedCall { id, name, args })),
            Message::Response { id, name, result } => {
                self.settle(id, &name, Ok(result));
                Ok(None)
            }
            Message::Error {
                id,
                name,
                error_json,
            } => {
                self.settle(id, &name, Err(CallError::from_error_json(&error_json)));
                Ok(None)
            }
            Message::Connect => {
                self.connect(&adapter);
                Ok(None)
            }
        }
    }

    /// Runs the handler for a call and replies, or buffers the call if there is none
    async fn dispatch(&self, call: BufferedCall) {
        match self.begin_call(call) {
            Ok(reply) => reply.await,
            Err(call) => self.buffer(call),
        }
    }

    /// Appends a call to the pending buffer for its name
    fn buffer(&self, call: BufferedCall) {
        let mut state = self.state.borrow_mut();
        debug!(
            "{} buffered {} for {} until a handler is registered",
            state.endpoint, call.id, call.name
        );
        state.pending.push(call);
    }

    /// Prepares the handler run and reply for a call
    ///
    /// Hands the call back when no handler is registered for its name.
    fn begin_call(&self, call: BufferedCall) -> Result<Reply, BufferedCall> {
        let (endpoint, handler) = {
            let state = self.state.borrow();
            (state.endpoint, state.receivers.get(&call.name))
        };

        let handler = match handler {
            Some(handler) => handler,
            None => return Err(call),
        };

        let bridge = self.clone();
        Ok(async move {
            let BufferedCall { id, name, args } = call;
            let reply = match invoke(&handler, args).await {
                Ok(result) => Message::Response { id, name, result },
                Err(err) => {
                    debug!("{} handler for {} failed: {}", endpoint, name, err);
                    Message::Error {
                        id,
                        name,
                        error_json: encode_failure(err),
                    }
                }
            };
            if let Err(err) = bridge.post(reply) {
                warn!("{} could not reply to {}: {}", endpoint, id, err);
            }
        }
        .boxed_local())
    }

    /// Replays the calls buffered under `name`, oldest first
    ///
    /// Stops as soon as the handler is gone. The calls not yet replayed go
    /// back to the front of the queue, ahead of any that arrived meanwhile.
    async fn drain(&self, name: String) {
        let (endpoint, mut calls) = {
            let mut state = self.state.borrow_mut();
            (state.endpoint, state.pending.take(&name))
        };
        if calls.is_empty() {
            return;
        }

        debug!("{} draining {} buffered call(s) for {}", endpoint, calls.len(), name);

        while let Some(call) = calls.pop_front() {
            match self.begin_call(call) {
                Ok(reply) => reply.await,
                Err(call) => {
                    calls.push_front(call);
                    debug!(
                        "{} handler for {} removed, {} call(s) stay buffered",
                        endpoint,
                        name,
                        calls.len()
                    );
                    self.state.borrow_mut().pending.requeue_front(&name, calls);
                    return;
                }
            }
        }
    }

    /// Settles and forgets an outstanding call
    fn settle(&self, id: CallId, name: &str, outcome: Result<Value, CallError>) {
        let (endpoint, settler) = {
            let mut state = self.state.borrow_mut();
            (state.endpoint, state.calls.take(id))
        };

        let settler = match settler {
            Some(settler) => settler,
            None => {
                warn!("{} ignored reply for unknown {} ({})", endpoint, id, name);
                return;
            }
        };

        match outcome {
            Ok(result) => {
                debug!("{} {} <- {} ok", endpoint, id, name);
                settler.resolve(result);
            }
            Err(err) => {
                if matches!(err, CallError::MalformedPayload(_)) {
                    warn!("{} {} <- {}: {}", endpoint, id, name, err);
                } else {
                    debug!("{} {} <- {} failed: {}", endpoint, id, name, err);
                }
                settler.reject(err);
            }
        }
    }

    /// Marks the channel connected and flushes queued traffic in order
    fn connect(&self, adapter: &TransportAdapter) {
        let (endpoint, first, queued) = {
            let mut state = self.state.borrow_mut();
            let first = !state.connected;
            state.connected = true;
            (state.endpoint, first, state.outbound.drain())
        };

        if first {
            info!("{} connected, flushing {} queued message(s)", endpoint, queued.len());
        }

        for message in queued {
            if let Err(err) = adapter.send(&message) {
                warn!("{} could not flush {}: {}", endpoint, message.kind(), err);
            }
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Bridge")
            .field("endpoint", &state.endpoint)
            .field("role", &state.adapter.as_ref().map(|adapter| adapter.role()))
            .field("connected", &state.connected)
            .field("outstanding", &state.calls.len())
            .field("buffered", &state.pending.total())
            .field("queued", &state.outbound.len())
            .finish()
    }
}

/// Runs a handler to completion, turning a panic into a failure
async fn invoke(handler: &Handler, args: Vec<Value>) -> Result<Value, HandlerError> {
    let invocation = match panic::catch_unwind(AssertUnwindSafe(|| handler(args))) {
        Ok(invocation) => invocation,
        Err(payload) => return Err(panic_failure(payload)),
    };
    AssertUnwindSafe(invocation)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panic_failure(payload)))
}

/// Describes a caught handler panic
fn panic_failure(payload: Box<dyn Any + Send>) -> HandlerError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    let message = match detail {
        Some(detail) => format!("handler panicked: {}", detail),
        None => String::from("handler panicked"),
    };
    warn!("{}", message);
    HandlerError::new(message).with_field("name", "Panic")
}

/// Serializes a handler failure into `errorJSON`
fn encode_failure(err: HandlerError) -> String {
    let message = err.message.clone();
    err.into_payload().encode().unwrap_or_else(|encode_err| {
        warn!("could not encode handler failure: {}", encode_err);
        ErrorPayload::new(message)
            .encode()
            .unwrap_or_else(|_| String::from("{}"))
    })
}
