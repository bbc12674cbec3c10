//! Turning panics from user work into values.
//!
//! Neither executor lets a panic from submitted work unwind through its own
//! threads. `catch_panic` is the single place that happens; the queue uses
//! it directly per task and the dispatcher goes through `PanicHandler`,
//! which also counts and optionally logs what it swallowed.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What to do with a panic nobody is going to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Swallow silently.
    Isolate,
    /// Swallow and report through `tracing` at warn level.
    #[default]
    LogAndContinue,
}

/// A panic caught on an executor thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    /// The panic message, or `"Unknown panic"` for non-string payloads.
    pub message: String,
    /// Name of the thread the panic was caught on, if it had one.
    pub thread: Option<String>,
}

impl PanicInfo {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        // payloads are arbitrary values and their Drop may panic again
        if let Err(nested) = catch_unwind(AssertUnwindSafe(move || drop(payload))) {
            std::mem::forget(nested);
        }

        Self {
            message,
            thread: std::thread::current().name().map(str::to_string),
        }
    }
}

/// Runs `f`, converting an unwinding panic into `Err(PanicInfo)`.
pub(crate) fn catch_panic<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

/// Swallows panics for the dispatcher according to a [`PanicStrategy`].
#[derive(Debug)]
pub(crate) struct PanicHandler {
    strategy: PanicStrategy,
    swallowed: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            swallowed: AtomicUsize::new(0),
        }
    }

    /// Runs `f` to completion or to a swallowed panic.
    pub fn run<F>(&self, f: F)
    where
        F: FnOnce(),
    {
        let Err(info) = catch_panic(f) else {
            return;
        };
        self.swallowed.fetch_add(1, Ordering::Relaxed);

        if self.strategy == PanicStrategy::LogAndContinue {
            tracing::warn!(
                thread = info.thread.as_deref().unwrap_or("<unnamed>"),
                message = %info.message,
                "dispatched work panicked"
            );
        }
    }

    /// Panics swallowed so far.
    pub fn swallowed(&self) -> usize {
        self.swallowed.load(Ordering::Relaxed)
    }
}
