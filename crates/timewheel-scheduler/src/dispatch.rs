//! Detached execution of due callbacks.
//!
//! Each callback runs on the blocking pool as its own unit. A panic is caught,
//! logged, and counted there; it never reaches the scheduler loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::slots::Due;

#[derive(Default)]
pub(crate) struct Dispatcher {
    panics: Arc<AtomicU64>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `due` without waiting for it to run.
    pub fn dispatch(&self, due: Due) {
        let panics = Arc::clone(&self.panics);
        tokio::task::spawn_blocking(move || {
            let Due { id, callback } = due;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
                panics.fetch_add(1, Ordering::Relaxed);
                tracing::error!(timer = %id, "Timer callback panicked: {}", panic_message(payload.as_ref()));
            }
        });
    }

    /// Callbacks that panicked so far.
    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
