//! offload - run work off the calling thread.
//!
//! Two independent primitives:
//!
//! - [`WorkQueue`]: one background thread executing submitted tasks in
//!   strict FIFO order. Every submission returns a [`TaskHandle`] that
//!   yields the task's value, or the panic it raised, as a [`Result`].
//! - [`Dispatcher`]: fire-and-forget. Every dispatch gets its own thread;
//!   the dispatcher tracks them all and its `Drop` joins whatever is still
//!   running, so no thread outlives it unobserved.
//!
//! # Quick Start
//!
//! ```
//! use offload::prelude::*;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let queue = WorkQueue::new().unwrap();
//! let sum = queue.assign(add, (2, 3));
//! assert_eq!(sum.get().unwrap(), 5);
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .dispatch(|ms: u64| std::thread::sleep(std::time::Duration::from_millis(ms)), (5,))
//!     .unwrap();
//! drop(dispatcher); // waits for the sleeping thread
//! ```
//!
//! Arguments are passed as a tuple and moved into the task, so they must be
//! `Send + 'static`. Unit-returning work resolves its handle with `()`.

#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod util;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{Dispatcher, PanicStrategy, TaskHandle, WorkQueue};
