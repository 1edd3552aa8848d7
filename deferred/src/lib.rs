//! # Deferred
//!
//! A settle-once future for single-threaded engines.
//!
//! ## Philosophy
//!
//! - **Settled from outside**: the consumer awaits, someone else decides the outcome
//! - **First settlement wins**: later attempts are ignored, never an error
//! - **Controllers exist up front**: the [`Settler`] is usable the moment it is
//!   constructed, before any asynchronous work begins
//! - **No built-in timeout**: a deferred nobody settles stays pending forever;
//!   callers that need a bounded wait compose their own timeout around it
//!
//! ## Core Concepts
//!
//! - `Settler`: controller that fulfills or rejects exactly once
//! - `Deferred`: cloneable future observing the settlement
//! - `Settlement`: pending, fulfilled or rejected
//!
//! ## Example
//!
//! ```
//! use deferred::Settler;
//!
//! let settler = Settler::<u32, String>::new();
//! let deferred = settler.deferred();
//!
//! assert!(settler.resolve(5));
//! assert!(!settler.reject("too late".to_string()));
//!
//! assert_eq!(futures::executor::block_on(deferred), Ok(5));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Observable state of a deferred value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    /// Checks if the value is still pending
    pub fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }
}

enum State<T, E> {
    Pending(Vec<Waker>),
    Fulfilled(T),
    Rejected(E),
}

/// Shared state between Settler and Deferred
struct SharedState<T, E> {
    state: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Clone for SharedState<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T, E> SharedState<T, E> {
    fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(Vec::new()))),
        }
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), State::Pending(_))
    }

    fn settle(&self, outcome: State<T, E>) -> bool {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if !matches!(*state, State::Pending(_)) {
                return false;
            }
            match mem::replace(&mut *state, outcome) {
                State::Pending(wakers) => wakers,
                _ => Vec::new(),
            }
        };
        // Woken tasks may poll straight away; the borrow is already released.
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl<T: Clone, E: Clone> SharedState<T, E> {
    fn snapshot(&self) -> Settlement<T, E> {
        match &*self.state.borrow() {
            State::Pending(_) => Settlement::Pending,
            State::Fulfilled(value) => Settlement::Fulfilled(value.clone()),
            State::Rejected(error) => Settlement::Rejected(error.clone()),
        }
    }
}

/// Controller that settles a deferred value
///
/// Whichever of [`resolve`](Self::resolve) or [`reject`](Self::reject) runs
/// first decides the outcome; every later call is a no-op returning `false`.
pub struct Settler<T, E> {
    shared: SharedState<T, E>,
}

impl<T, E> Settler<T, E> {
    /// Creates a new settler with a pending value
    pub fn new() -> Self {
        Self {
            shared: SharedState::new(),
        }
    }

    /// Creates a future observing this settler
    ///
    /// May be called any number of times, before or after settlement.
    pub fn deferred(&self) -> Deferred<T, E> {
        Deferred {
            shared: self.shared.clone(),
        }
    }

    /// Fulfills the value. Returns whether this call took effect.
    pub fn resolve(&self, value: T) -> bool {
        self.shared.settle(State::Fulfilled(value))
    }

    /// Rejects the value. Returns whether this call took effect.
    pub fn reject(&self, error: E) -> bool {
        self.shared.settle(State::Rejected(error))
    }

    /// Checks if the value has been settled
    pub fn is_settled(&self) -> bool {
        !self.shared.is_pending()
    }
}

impl<T, E> Default for Settler<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Settler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// A value that a [`Settler`] will provide later
///
/// Every clone observes the same outcome. Awaiting yields `Ok` for a
/// fulfilled value and `Err` for a rejected one.
pub struct Deferred<T, E> {
    shared: SharedState<T, E>,
}

impl<T, E> Deferred<T, E> {
    /// Checks if the value is still pending
    pub fn is_pending(&self) -> bool {
        self.shared.is_pending()
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    /// Returns the current settlement without waiting
    pub fn settlement(&self) -> Settlement<T, E> {
        self.shared.snapshot()
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T: Clone, E: Clone> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.borrow_mut();
        match &mut *state {
            State::Pending(wakers) => {
                if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
            State::Fulfilled(value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(error) => Poll::Ready(Err(error.clone())),
        }
    }
}
