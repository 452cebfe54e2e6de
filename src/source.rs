//! # Source
//!
//! Entry stages with no input channel. A source calls a producer function a
//! fixed number of times, or forever, and pushes what it returns.
//!
//! A [`Repeat::Forever`] source only stops when its stage is cancelled through
//! [`StageConfig::with_cancellation`].
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::{Repeat, StageConfig, source};
//!
//! # tokio_test::block_on(async {
//! let mut next = 0;
//! let numbers = source(&StageConfig::new(1, 4), Repeat::Times(3), move || {
//!   next += 1;
//!   next
//! });
//!
//! assert_eq!(numbers.pull_safe().await, Some(1));
//! assert_eq!(numbers.pull_safe().await, Some(2));
//! assert_eq!(numbers.pull_safe().await, Some(3));
//! assert_eq!(numbers.pull_safe().await, None);
//! # });
//! ```

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;

/// How many times a source invokes its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
  /// Invoke the producer exactly this many times.
  Times(usize),
  /// Invoke the producer until the stage is cancelled.
  Forever,
}

impl Repeat {
  fn allows(self, done: usize) -> bool {
    match self {
      Repeat::Times(n) => done < n,
      Repeat::Forever => true,
    }
  }
}

/// Pushes the values returned by `produce`, `repeat` times.
///
/// The producer runs on a single task, so it may hold mutable state.
pub fn source<T, F>(config: &StageConfig, repeat: Repeat, mut produce: F) -> ChanPull<T>
where
  T: Send + 'static,
  F: FnMut() -> T + Send + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();

  WorkerGroup::new(config, "source").spawn_one(
    move |worker| async move {
      let mut done = 0;
      while repeat.allows(done) && !worker.is_cancelled() {
        done += 1;
        if !worker.emit(&out, produce()).await {
          break;
        }
      }
    },
    move || closer.close(),
  );

  pull
}

/// Fallible [`source`]. Every invocation counts towards `repeat`, whether it
/// produced a value or an error.
pub fn source_with_error<T, E, F>(
  config: &StageConfig,
  repeat: Repeat,
  mut produce: F,
) -> (ChanPull<T>, ChanPull<E>)
where
  T: Send + 'static,
  E: Send + 'static,
  F: FnMut() -> Result<T, E> + Send + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let (errs, err_pull) = Chan::new(config.size()).split();
  let (out_closer, err_closer) = (out.clone(), errs.clone());

  WorkerGroup::new(config, "source").spawn_one(
    move |worker| async move {
      let mut done = 0;
      while repeat.allows(done) && !worker.is_cancelled() {
        done += 1;
        let emitted = match produce() {
          Ok(t) => worker.emit(&out, t).await,
          Err(e) => worker.emit(&errs, e).await,
        };
        if !emitted {
          break;
        }
      }
    },
    move || {
      err_closer.close();
      out_closer.close();
    },
  );

  (pull, err_pull)
}

/// Fallible [`source`] reporting failures to `sink`.
pub fn source_with_error_sink<T, E, F, S>(
  config: &StageConfig,
  repeat: Repeat,
  mut produce: F,
  mut sink: S,
) -> ChanPull<T>
where
  T: Send + 'static,
  E: Send + 'static,
  F: FnMut() -> Result<T, E> + Send + 'static,
  S: FnMut(E) + Send + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();

  WorkerGroup::new(config, "source").spawn_one(
    move |worker| async move {
      let mut done = 0;
      while repeat.allows(done) && !worker.is_cancelled() {
        done += 1;
        match produce() {
          Ok(t) => {
            if !worker.emit(&out, t).await {
              break;
            }
          }
          Err(e) => sink(e),
        }
      }
    },
    move || closer.close(),
  );

  pull
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_repeat_allows() {
    assert!(Repeat::Times(2).allows(1));
    assert!(!Repeat::Times(2).allows(2));
    assert!(!Repeat::Times(0).allows(0));
    assert!(Repeat::Forever.allows(usize::MAX));
  }

  #[tokio::test]
  async fn test_zero_repeats_closes_immediately() {
    let out = source(&StageConfig::default(), Repeat::Times(0), || 1);
    assert_eq!(out.pull_safe().await, None);
  }

  #[tokio::test]
  async fn test_forever_stops_on_cancel() {
    let config = StageConfig::new(1, 2);
    let out = source(&config, Repeat::Forever, || 7u8);
    for _ in 0..10 {
      assert_eq!(out.pull_safe().await, Some(7));
    }
    config.cancellation().cancel();
    out.drain().await;
    assert!(out.is_closed());
  }

  #[tokio::test]
  async fn test_source_with_error_splits_results() {
    let mut calls = 0;
    let (values, errors) = source_with_error(&StageConfig::new(1, 8), Repeat::Times(6), move || {
      calls += 1;
      if calls % 3 == 0 { Err(calls) } else { Ok(calls) }
    });

    let mut got = Vec::new();
    while let Some(v) = values.pull_safe().await {
      got.push(v);
    }
    let mut failed = Vec::new();
    while let Some(e) = errors.pull_safe().await {
      failed.push(e);
    }
    assert_eq!(got, vec![1, 2, 4, 5]);
    assert_eq!(failed, vec![3, 6]);
  }

  #[tokio::test]
  async fn test_source_with_error_sink() {
    let (seen, reported) = crate::chan::Chan::new(8).split();
    let mut calls = 0;
    let values = source_with_error_sink(
      &StageConfig::new(1, 8),
      Repeat::Times(4),
      move || {
        calls += 1;
        if calls % 2 == 0 { Err(format!("even {calls}")) } else { Ok(calls) }
      },
      move |e| seen.try_push(e).unwrap(),
    );

    assert_eq!(values.pull_safe().await, Some(1));
    assert_eq!(values.pull_safe().await, Some(3));
    assert_eq!(values.pull_safe().await, None);
    assert_eq!(reported.try_pull().as_deref(), Ok("even 2"));
    assert_eq!(reported.try_pull().as_deref(), Ok("even 4"));
  }
}
