//! Task execution infrastructure.
//!
//! This module provides the two execution primitives, the single-worker
//! [`WorkQueue`] and the fire-and-forget [`Dispatcher`], together with the
//! type-erased task and argument-binding machinery they share.

pub mod dispatcher;
pub mod invoke;
pub mod panic_handler;
pub mod task;
pub mod work_queue;

pub use dispatcher::{DispatchStatsSnapshot, Dispatcher};
pub use invoke::Invoke;
pub use panic_handler::{PanicInfo, PanicStrategy};
pub use task::{TaskHandle, TaskId};
pub use work_queue::{QueueStatsSnapshot, WorkQueue};
