//! Fault containment for core calls
//!
//! The core is a black box that can fail for many internal reasons: a bad
//! ROM, a lost graphics context, a corrupt save state. Every core-facing
//! operation passes through the guard, which converts any failure into one
//! error event and freezes the session. Nothing is retried; a faulted
//! session must be discarded and recreated by the host.

use rb_core::{CoreError, CoreResult, Topic};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Wraps core operations with abort gating and panic containment.
///
/// The abort flag is monotonic: once any guarded operation fails, all later
/// guarded operations are skipped without touching the core. Skipping is
/// best effort across threads; an operation already dispatched when the flag
/// flips still completes, which is harmless.
#[derive(Clone)]
pub struct FaultGuard {
    /// Monotonic abort flag, shared with the lifecycle state
    aborted: Arc<AtomicBool>,
    /// Cleared on fault so the frame tick stops stepping
    ready: Arc<AtomicBool>,
    /// Outward error stream carrying stable error codes
    errors: Topic<i32>,
}

impl FaultGuard {
    pub fn new(aborted: Arc<AtomicBool>, ready: Arc<AtomicBool>, errors: Topic<i32>) -> Self {
        Self {
            aborted,
            ready,
            errors,
        }
    }

    /// Run a fallible core operation, returning `fallback` when the session
    /// is aborted or the operation fails. Failures never propagate to the
    /// caller; they surface as a single code on the error stream.
    pub fn run<T>(&self, fallback: T, op: impl FnOnce() -> CoreResult<T>) -> T {
        if self.aborted.load(Ordering::Acquire) {
            return fallback;
        }
        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => {
                self.fault(error);
                fallback
            }
            Err(payload) => {
                self.fault(CoreError::Generic(panic_message(payload.as_ref())));
                fallback
            }
        }
    }

    /// Guard a void operation.
    pub fn protect(&self, op: impl FnOnce() -> CoreResult<()>) {
        self.run((), op);
    }

    /// Record a fault. The first reporter publishes the error code and
    /// freezes the session; later faults are only logged.
    pub fn fault(&self, error: CoreError) {
        if self.aborted.swap(true, Ordering::AcqRel) {
            tracing::debug!("Session already aborted, dropping fault: {}", error);
            return;
        }
        self.ready.store(false, Ordering::Release);
        tracing::error!("Core fault, aborting session: {}", error);
        self.errors.publish(error.code());
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "core panicked".to_string()
    }
}
