//! Type-erased tasks and their result handles.

use super::invoke::Invoke;
use super::panic_handler::{catch_panic, PanicInfo};
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, as shown in logs.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

type Outcome<T> = std::result::Result<T, PanicInfo>;

/// A pending unit of work whose result type has been erased.
pub(crate) trait Execute: Send {
    fn id(&self) -> TaskId;

    /// Runs the task and resolves its handle. `Err` reports that the task
    /// panicked; the panic has already been delivered to the handle.
    fn execute(self: Box<Self>) -> std::result::Result<(), PanicInfo>;
}

/// A callable with its arguments bound, paired with the sending half of a
/// one-shot result channel.
pub(crate) struct PackagedTask<F, A, T> {
    id: TaskId,
    func: F,
    args: A,
    result_tx: Sender<Outcome<T>>,
    spawn_time: Instant,
}

impl<F, A, T> PackagedTask<F, A, T>
where
    F: Invoke<A, Output = T>,
    A: Send + 'static,
    T: Send + 'static,
{
    pub fn new(func: F, args: A) -> (Self, TaskHandle<T>) {
        let id = TaskId::next();
        let (result_tx, result_rx) = bounded(1);
        let task = PackagedTask {
            id,
            func,
            args,
            result_tx,
            spawn_time: Instant::now(),
        };
        let handle = TaskHandle {
            id,
            result_rx,
            outcome: None,
        };
        (task, handle)
    }
}

impl<F, A, T> Execute for PackagedTask<F, A, T>
where
    F: Invoke<A, Output = T>,
    A: Send + 'static,
    T: Send + 'static,
{
    fn id(&self) -> TaskId {
        self.id
    }

    fn execute(self: Box<Self>) -> std::result::Result<(), PanicInfo> {
        let PackagedTask {
            id,
            func,
            args,
            result_tx,
            spawn_time,
        } = *self;

        tracing::trace!(task = id.as_u64(), queued_for = ?spawn_time.elapsed(), "executing task");

        let outcome = catch_panic(move || func.invoke(args));
        let report = match &outcome {
            Ok(_) => Ok(()),
            Err(info) => Err(info.clone()),
        };

        // With the handle gone the value comes back in the SendError, and a
        // value left in the channel is freed with the last sender. Either way
        // it is dropped on this thread and its Drop may panic.
        let delivered = catch_panic(move || {
            let _ = result_tx.send(outcome);
            drop(result_tx);
        });

        match delivered {
            Ok(()) => report,
            Err(info) => Err(info),
        }
    }
}

impl<F, A, T> std::fmt::Debug for PackagedTask<F, A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagedTask")
            .field("id", &self.id)
            .field("spawn_time", &self.spawn_time)
            .finish()
    }
}

/// Caller side of a submitted task.
///
/// The handle resolves exactly once: with the task's return value, with the
/// panic it raised, or with [`Error::QueueShutdown`] if the queue was dropped
/// before the task ran. Waiting caches the outcome, so `wait` followed by
/// `get` never blocks twice.
pub struct TaskHandle<T> {
    id: TaskId,
    result_rx: Receiver<Outcome<T>>,
    outcome: Option<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// ID of the task this handle belongs to.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Blocks until the task is resolved.
    pub fn wait(&mut self) {
        if self.outcome.is_none() {
            let outcome = Self::convert(self.result_rx.recv().ok());
            self.outcome = Some(outcome);
        }
    }

    /// Blocks for at most `timeout`. Returns whether the task is resolved.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.outcome = Some(Self::convert(Some(outcome)));
                true
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.outcome = Some(Self::convert(None));
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// Non-blocking check for resolution.
    pub fn is_ready(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.result_rx.try_recv() {
            Ok(outcome) => {
                self.outcome = Some(Self::convert(Some(outcome)));
                true
            }
            Err(TryRecvError::Disconnected) => {
                self.outcome = Some(Self::convert(None));
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Blocks until resolved, then yields the value or the captured failure.
    pub fn get(mut self) -> Result<T> {
        self.wait();
        self.outcome.take().unwrap_or(Err(Error::QueueShutdown))
    }

    fn convert(received: Option<Outcome<T>>) -> Result<T> {
        match received {
            Some(Ok(value)) => Ok(value),
            Some(Err(info)) => Err(Error::TaskPanicked(info.message)),
            // sender dropped without sending: the task was discarded
            None => Err(Error::QueueShutdown),
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("resolved", &self.outcome.is_some())
            .finish()
    }
}
