//! Fire-and-forget dispatch onto dedicated threads.
//!
//! Every [`Dispatcher::dispatch`] starts a fresh OS thread and records its
//! `JoinHandle` in a registry keyed by `ThreadId`. When the work finishes
//! the thread takes its own entry out of the registry and drops the handle,
//! which detaches it. Dropping the `Dispatcher` swaps the whole registry out
//! under the lock and joins what it took *after* releasing the lock, so a
//! thread racing to remove itself never waits on a lock held across a join.
//!
//! Each thread ends up either detached by itself or joined by the owner,
//! never both.

use super::invoke::Invoke;
use super::panic_handler::PanicHandler;
use crate::config::Config;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

struct Registry {
    handles: Mutex<HashMap<ThreadId, JoinHandle<()>>>,
    panic_handler: PanicHandler,
    stats: DispatchStats,
    #[cfg(test)]
    before_removal: Option<Box<dyn Fn() + Send + Sync>>,
}

#[derive(Debug, Default)]
struct DispatchStats {
    dispatched: AtomicU64,
    self_detached: AtomicU64,
    joined_on_drop: AtomicU64,
}

/// Point-in-time copy of a dispatcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    /// Threads successfully spawned.
    pub dispatched: u64,
    /// Panics swallowed from dispatched work.
    pub panicked: u64,
    /// Threads that finished, removed themselves and detached.
    pub self_detached: u64,
    /// Threads joined by the dispatcher's `Drop`.
    pub joined_on_drop: u64,
}

/// Launches work that nobody waits on, without leaking threads.
///
/// Panics raised by dispatched work are swallowed and handled according to
/// the configured [`PanicStrategy`](super::PanicStrategy). Dropping the
/// dispatcher blocks until every thread that is still registered has
/// finished.
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: Config,
}

impl Dispatcher {
    /// Creates a dispatcher with the default [`Config`].
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    /// Creates a dispatcher after validating `config`.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        Self {
            registry: Arc::new(Registry {
                handles: Mutex::new(HashMap::new()),
                panic_handler: PanicHandler::new(config.panic_strategy),
                stats: DispatchStats::default(),
                #[cfg(test)]
                before_removal: None,
            }),
            config,
        }
    }

    /// Runs `func(args...)` on a new thread and returns immediately.
    ///
    /// Fails only if the operating system refuses to create the thread.
    pub fn dispatch<F, A>(&self, func: F, args: A) -> Result<()>
    where
        F: Invoke<A>,
        A: Send + 'static,
    {
        let registry = self.registry.clone();

        // held across the spawn so the thread cannot look itself up before
        // it has been inserted
        let mut handles = self.registry.handles.lock();
        let seq = self.registry.stats.dispatched.load(Ordering::Relaxed);

        let handle = self
            .config
            .thread_builder(&format!("dispatch-{}", seq))
            .spawn(move || registry.run(func, args))
            .map_err(|e| Error::spawn(format!("dispatch: {}", e)))?;

        let id = handle.thread().id();
        let previous = handles.insert(id, handle);
        debug_assert!(previous.is_none(), "thread id registered twice");
        self.registry.stats.dispatched.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(thread = ?id, "dispatched");
        Ok(())
    }

    /// Threads that have been dispatched and not yet removed themselves.
    pub fn in_flight(&self) -> usize {
        self.registry.handles.lock().len()
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> DispatchStatsSnapshot {
        let stats = &self.registry.stats;
        DispatchStatsSnapshot {
            dispatched: stats.dispatched.load(Ordering::Relaxed),
            panicked: self.registry.panic_handler.swallowed() as u64,
            self_detached: stats.self_detached.load(Ordering::Relaxed),
            joined_on_drop: stats.joined_on_drop.load(Ordering::Relaxed),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    fn with_removal_hook<H>(hook: H) -> Self
    where
        H: Fn() + Send + Sync + 'static,
    {
        let mut dispatcher = Self::new();
        if let Some(registry) = Arc::get_mut(&mut dispatcher.registry) {
            registry.before_removal = Some(Box::new(hook));
        }
        dispatcher
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    fn run<F, A>(&self, func: F, args: A)
    where
        F: Invoke<A>,
        A: Send + 'static,
    {
        // the output has nowhere to go
        self.panic_handler.run(move || {
            drop(func.invoke(args));
        });

        #[cfg(test)]
        if let Some(hook) = &self.before_removal {
            hook();
        }

        self.remove_current();
    }

    fn remove_current(&self) {
        let mut handles = self.handles.lock();

        match handles.remove(&thread::current().id()) {
            Some(handle) => {
                // dropping a JoinHandle detaches the thread
                drop(handle);
                self.stats.self_detached.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                // taken by Dispatcher::drop, which joins us
                debug_assert!(handles.is_empty());
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let handles = std::mem::take(&mut *self.registry.handles.lock());

        if !handles.is_empty() {
            tracing::debug!(count = handles.len(), "joining dispatched threads");
        }

        let current = thread::current().id();
        for (id, handle) in handles {
            // dropped from one of our own threads: joining it would deadlock
            if id == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!(thread = ?id, "dispatched thread panicked outside its work");
            }
            self.registry
                .stats
                .joined_on_drop
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("in_flight", &self.in_flight())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PanicStrategy;
    use crossbeam_channel::{bounded, unbounded};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[test]
    fn test_dispatch_runs_work() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let dispatcher = Dispatcher::new();
            for _ in 0..8 {
                let counter = counter.clone();
                dispatcher
                    .dispatch(
                        move |n: usize| {
                            counter.fetch_add(n, Ordering::SeqCst);
                        },
                        (2,),
                    )
                    .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_self_removal() {
        let dispatcher = Dispatcher::new();
        let (done_tx, done_rx) = bounded(1);
        dispatcher.dispatch(move || done_tx.send(()).unwrap(), ()).unwrap();
        done_rx.recv().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while dispatcher.in_flight() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(dispatcher.in_flight(), 0);
        assert_eq!(dispatcher.stats().self_detached, 1);
    }

    #[test]
    fn test_drop_joins_running_threads() {
        let finished = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new();
        for _ in 0..4 {
            let finished = finished.clone();
            dispatcher
                .dispatch(
                    move |ms: u64| {
                        thread::sleep(Duration::from_millis(ms));
                        finished.fetch_add(1, Ordering::SeqCst);
                    },
                    (30,),
                )
                .unwrap();
        }
        drop(dispatcher);
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_panic_is_swallowed() {
        let config = Config::builder()
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap();
        let dispatcher = Dispatcher::with_config(config).unwrap();
        let (done_tx, done_rx) = bounded(1);

        dispatcher.dispatch(|| panic!("ignored"), ()).unwrap();
        dispatcher.dispatch(move || done_tx.send(7).unwrap(), ()).unwrap();

        assert_eq!(done_rx.recv().unwrap(), 7);
        drop(dispatcher);
    }

    #[test]
    fn test_no_self_join_deadlock() {
        // Dispatched threads park right before removing themselves until
        // the dispatcher has already swapped the registry out.
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let (finished_tx, finished_rx) = bounded(1);

        let driver = thread::spawn(move || {
            let dispatcher = Dispatcher::with_removal_hook(move || {
                entered_tx.send(()).unwrap();
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
            });
            dispatcher.dispatch(|| (), ()).unwrap();
            dispatcher.dispatch(|| (), ()).unwrap();

            entered_rx.recv().unwrap();
            entered_rx.recv().unwrap();
            assert_eq!(dispatcher.in_flight(), 2);

            // release only once drop has taken the handles
            let registry = dispatcher.registry.clone();
            let releaser = thread::spawn(move || {
                while !registry.handles.lock().is_empty() {
                    thread::sleep(Duration::from_millis(1));
                }
                release_tx.send(()).unwrap();
                release_tx.send(()).unwrap();
                registry
            });

            drop(dispatcher);
            let registry = releaser.join().unwrap();
            finished_tx
                .send(registry.stats.joined_on_drop.load(Ordering::SeqCst))
                .unwrap();
        });

        let joined = finished_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("dispatcher drop deadlocked");
        assert_eq!(joined, 2);
        driver.join().unwrap();
    }

    #[test]
    fn test_drop_from_dispatched_thread() {
        let (done_tx, done_rx) = bounded(1);
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = dispatcher.clone();

        dispatcher
            .dispatch(
                move || {
                    thread::sleep(Duration::from_millis(20));
                    // last reference goes away on a registered thread
                    drop(inner);
                    done_tx.send(()).unwrap();
                },
                (),
            )
            .unwrap();
        drop(dispatcher);

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("self-drop deadlocked");
    }
}
