//! # Channel Errors
//!
//! Errors reported by the non-blocking channel operations.
//!
//! Blocking operations have no error type: pulling from a closed-and-drained
//! channel is the regular end of a stream, and pushing to a closed channel is a
//! programming error that panics.

use thiserror::Error;

/// Error returned by [`try_push`](crate::ChanPush::try_push).
///
/// The rejected value is handed back so the caller can retry or drop it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TryPushError<T> {
  /// The channel has no free slot, or no consumer is waiting on a rendezvous
  /// channel.
  #[error("channel is full")]
  Full(T),
}

impl<T> TryPushError<T> {
  /// Returns the value that could not be pushed.
  pub fn into_inner(self) -> T {
    match self {
      TryPushError::Full(t) => t,
    }
  }
}

/// Error returned by [`try_pull`](crate::ChanPull::try_pull).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryPullError {
  /// The channel is open but holds no value right now.
  #[error("channel is empty")]
  Empty,
  /// The channel is closed and every value has been pulled.
  #[error("channel is closed")]
  Closed,
}
