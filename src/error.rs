//! Error types for offload.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the queue, the dispatcher and their configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The task panicked; carries the panic message.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The task was discarded unexecuted because its queue was dropped.
    #[error("work queue shut down before the task ran")]
    QueueShutdown,

    /// The OS refused to create a thread.
    #[error("thread spawn failed: {0}")]
    Spawn(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a spawn error
    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::Spawn(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// True if the error carries a task's captured panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::TaskPanicked(_))
    }
}
