//! Local task spawning
//!
//! | Native                      | wasm32                              |
//! |-----------------------------|-------------------------------------|
//! | `tokio::task::spawn_local`  | `wasm_bindgen_futures::spawn_local` |
//!
//! Natively a task can only be spawned inside a `tokio::task::LocalSet`.
//! Outside one, [`spawn_local`] refuses the task instead of panicking and the
//! caller decides what to keep.

use std::fmt;
use std::future::Future;

/// The current thread has no local executor to run the task on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NoLocalExecutor;

impl fmt::Display for NoLocalExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no local executor (run inside a tokio LocalSet)")
    }
}

/// Spawns a `!Send` task on the current thread's executor
///
/// The task is dropped unpolled when it is refused.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn_local<F>(future: F) -> Result<(), NoLocalExecutor>
where
    F: Future<Output = ()> + 'static,
{
    use std::panic::{self, AssertUnwindSafe};

    if tokio::runtime::Handle::try_current().is_err() {
        return Err(NoLocalExecutor);
    }
    // tokio has no fallible spawn_local; it panics before touching the task.
    panic::catch_unwind(AssertUnwindSafe(move || {
        tokio::task::spawn_local(future);
    }))
    .map_err(|_| NoLocalExecutor)
}

/// Spawns a `!Send` task on the current thread's executor
#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn_local<F>(future: F) -> Result<(), NoLocalExecutor>
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
    Ok(())
}
