//! Configuration for the queue and dispatcher threads.

use crate::error::{Error, Result};
use crate::executor::PanicStrategy;

/// Smallest stack accepted for spawned threads.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Settings shared by [`WorkQueue`](crate::WorkQueue) and
/// [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Spawned threads are named `{prefix}-queue` or `{prefix}-dispatch-{n}`.
    pub thread_name_prefix: String,
    /// Stack size for spawned threads; `None` uses the std default.
    pub stack_size: Option<usize>,
    /// How the dispatcher treats panics from dispatched work.
    pub panic_strategy: PanicStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name_prefix: "offload".to_string(),
            stack_size: None,
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks the prefix is a usable thread name and the stack size is at
    /// least [`MIN_STACK_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }
        // std::thread::Builder panics on interior NUL bytes
        if self.thread_name_prefix.contains('\0') {
            return Err(Error::config("thread_name_prefix must not contain NUL"));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(Error::config(format!(
                    "stack_size too small (min {} bytes)",
                    MIN_STACK_SIZE
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn thread_builder(&self, suffix: &str) -> std::thread::Builder {
        let mut builder =
            std::thread::Builder::new().name(format!("{}-{}", self.thread_name_prefix, suffix));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Starts from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the thread name prefix
    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set the stack size for spawned threads
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Set the panic strategy
    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
