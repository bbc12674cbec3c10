//! Single-worker FIFO queue.

use super::invoke::Invoke;
use super::task::{Execute, PackagedTask, TaskHandle};
use crate::config::Config;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

struct State {
    pending: VecDeque<Box<dyn Execute>>,
    should_stop: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    stats: QueueStats,
}

// counters for the worker
#[derive(Debug, Default)]
struct QueueStats {
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_discarded: AtomicU64,
}

/// Point-in-time copy of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    /// Tasks accepted by [`WorkQueue::assign`].
    pub tasks_submitted: u64,
    /// Tasks the worker ran, including those that panicked.
    pub tasks_executed: u64,
    /// Tasks that panicked, either while running or while their unclaimed
    /// result was dropped.
    pub tasks_panicked: u64,
    /// Tasks dropped unexecuted when the queue shut down.
    pub tasks_discarded: u64,
}

/// Runs submitted work one task at a time, in submission order, on a single
/// background thread.
///
/// Dropping the queue lets the running task finish, then discards whatever
/// is still pending; handles of discarded tasks resolve to
/// [`Error::QueueShutdown`]. The worker stops as soon as it sees the drop, so
/// a task assigned just before the queue is dropped (from another thread, or
/// right before `drop` on this one) may never start and resolve to
/// `QueueShutdown` as well.
pub struct WorkQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl WorkQueue {
    /// Starts a queue with the default [`Config`].
    pub fn new() -> Result<Self> {
        Self::with_config(&Config::default())
    }

    /// Starts a queue whose worker thread is built from `config`.
    ///
    /// Fails with [`Error::Config`] for an invalid config and with
    /// [`Error::Spawn`] if the worker thread cannot be created.
    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: VecDeque::new(),
                should_stop: false,
            }),
            available: Condvar::new(),
            stats: QueueStats::default(),
        });

        let worker_shared = shared.clone();
        let worker = config
            .thread_builder("queue")
            .spawn(move || worker_shared.run())
            .map_err(|e| Error::spawn(format!("work queue worker: {}", e)))?;

        tracing::debug!(thread = ?worker.thread().name(), "work queue started");

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queues `func(args...)` and returns a handle to its result.
    ///
    /// Never blocks on running work and never rejects a task.
    pub fn assign<F, A>(&self, func: F, args: A) -> TaskHandle<F::Output>
    where
        F: Invoke<A>,
        A: Send + 'static,
        F::Output: Send + 'static,
    {
        let (task, handle) = PackagedTask::new(func, args);

        {
            let mut state = self.shared.state.lock();
            state.pending.push_back(Box::new(task));
        }
        self.shared
            .stats
            .tasks_submitted
            .fetch_add(1, Ordering::Relaxed);

        self.shared.available.notify_one();

        handle
    }

    /// Tasks waiting to run, not counting the one currently running.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Snapshot of the queue counters.
    pub fn stats(&self) -> QueueStatsSnapshot {
        let stats = &self.shared.stats;
        QueueStatsSnapshot {
            tasks_submitted: stats.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: stats.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: stats.tasks_panicked.load(Ordering::Relaxed),
            tasks_discarded: stats.tasks_discarded.load(Ordering::Relaxed),
        }
    }
}

impl Shared {
    // main loop
    fn run(&self) {
        loop {
            let task = {
                let mut state = self.state.lock();
                while state.pending.is_empty() && !state.should_stop {
                    self.available.wait(&mut state);
                }

                if state.should_stop {
                    break;
                }

                match state.pending.pop_front() {
                    Some(task) => task,
                    None => continue,
                }
            };

            // lock is released here so assign() stays non-blocking
            let id = task.id();
            if let Err(info) = task.execute() {
                self.stats.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(task = id.as_u64(), message = %info.message, "task panicked");
            }
            self.stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
        }

        tracing::debug!("work queue worker exiting");
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shared.state.lock().should_stop = true;
        self.shared.available.notify_one();

        if let Some(worker) = self.worker.take() {
            // dropped by one of our own tasks: the worker exits on its own
            if worker.thread().id() == std::thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::warn!("work queue worker panicked");
            }
        }

        let discarded = std::mem::take(&mut self.shared.state.lock().pending);
        if !discarded.is_empty() {
            self.shared
                .stats
                .tasks_discarded
                .fetch_add(discarded.len() as u64, Ordering::Relaxed);
            tracing::debug!(count = discarded.len(), "discarding pending tasks");
        }
        // dropping the tasks disconnects their handles
        drop(discarded);
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("pending", &self.pending())
            .field("stats", &self.stats())
            .finish()
    }
}
