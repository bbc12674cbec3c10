//! Convenient re-exports of the commonly used types.

pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    Dispatcher, Invoke, PanicStrategy, TaskHandle, TaskId, WorkQueue,
};
pub use crate::is_any_equal;
