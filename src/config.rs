//! # Stage Configuration
//!
//! [`StageConfig`] carries the knobs shared by every stage: how many workers
//! pull from the input, how many values each output buffers, the name used in
//! log records, and the cancellation token that lets a caller stop the stage
//! early.
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::StageConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! let shutdown = CancellationToken::new();
//! let config = StageConfig::new(4, 16)
//!   .with_name("hash")
//!   .with_cancellation(shutdown.child_token());
//!
//! assert_eq!(config.workers(), 4);
//! assert_eq!(config.size(), 16);
//! assert_eq!(config.name_or("map"), "hash");
//! ```

use tokio_util::sync::CancellationToken;

/// Configuration shared by all pipeline stages.
///
/// Cloning a config shares its cancellation token, so cancelling one token
/// stops every stage configured from the same config.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
  /// Requested number of workers. Values below one are treated as one.
  pub workers: usize,
  /// Buffer capacity of each output channel the stage creates.
  pub size: usize,
  /// Name used in log records. Stages fall back to their own kind.
  pub name: Option<String>,
  /// Token that stops the stage when cancelled.
  pub cancel: CancellationToken,
}

impl StageConfig {
  /// Creates a config with `workers` workers and outputs buffering `size`
  /// values.
  pub fn new(workers: usize, size: usize) -> Self {
    Self {
      workers,
      size,
      ..Self::default()
    }
  }

  /// Sets the number of workers.
  #[must_use]
  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers;
    self
  }

  /// Sets the output buffer capacity.
  #[must_use]
  pub fn with_size(mut self, size: usize) -> Self {
    self.size = size;
    self
  }

  /// Sets the name used in log records.
  #[must_use]
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Replaces the cancellation token.
  #[must_use]
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Effective worker count, never less than one.
  pub fn workers(&self) -> usize {
    self.workers.max(1)
  }

  /// Output buffer capacity.
  pub fn size(&self) -> usize {
    self.size
  }

  /// The configured name, or `default` when none was set.
  pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
    self.name.as_deref().unwrap_or(default)
  }

  /// The cancellation token of this stage.
  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancel
  }
}
