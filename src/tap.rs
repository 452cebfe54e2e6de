//! # Tap
//!
//! Pass-through stages for side effects such as logging or metrics. A tap is
//! a [`map`](crate::map()) whose output type equals its input type.

use crate::chan::ChanPull;
use crate::config::StageConfig;
use crate::map::{map, map_with_error, map_with_error_sink};

/// Runs `tap` on every item and forwards what it returns.
pub fn tap<T, F>(config: &StageConfig, tap: F, input: ChanPull<T>) -> ChanPull<T>
where
  T: Send + 'static,
  F: Fn(T) -> T + Send + Sync + 'static,
{
  map(&named(config), tap, input)
}

/// Fallible [`tap`]; failures go to the second returned channel.
pub fn tap_with_error<T, E, F>(
  config: &StageConfig,
  tap: F,
  input: ChanPull<T>,
) -> (ChanPull<T>, ChanPull<E>)
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
{
  map_with_error(&named(config), tap, input)
}

/// Fallible [`tap`]; failures are passed to `sink`.
pub fn tap_with_error_sink<T, E, F, S>(
  config: &StageConfig,
  tap: F,
  sink: S,
  input: ChanPull<T>,
) -> ChanPull<T>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
  S: Fn(E) + Send + Sync + 'static,
{
  map_with_error_sink(&named(config), tap, sink, input)
}

fn named(config: &StageConfig) -> StageConfig {
  match config.name {
    Some(_) => config.clone(),
    None => config.clone().with_name("tap"),
  }
}
