//! # Map
//!
//! One-to-one transform stages backed by a worker pool.
//!
//! With more than one worker, items are handed to whichever worker pulls next,
//! so output order is not guaranteed. A single worker preserves input order.
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig, map};
//!
//! # tokio_test::block_on(async {
//! let (feed, input) = Chan::new(3).split();
//! let doubled = map(&StageConfig::new(1, 3), |x: i32| x * 2, input);
//!
//! for x in [1, 2, 3] {
//!   feed.push(x).await;
//! }
//! feed.close();
//!
//! assert_eq!(doubled.pull_safe().await, Some(2));
//! assert_eq!(doubled.pull_safe().await, Some(4));
//! assert_eq!(doubled.pull_safe().await, Some(6));
//! assert_eq!(doubled.pull_safe().await, None);
//! # });
//! ```

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::sync::Arc;

/// Applies `mp` to every item of `input`.
pub fn map<T, N, F>(config: &StageConfig, mp: F, input: ChanPull<T>) -> ChanPull<N>
where
  T: Send + 'static,
  N: Send + 'static,
  F: Fn(T) -> N + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();
  let mp = Arc::new(mp);

  WorkerGroup::new(config, "map").spawn(
    move |worker| {
      let (mp, input, out) = (Arc::clone(&mp), input.clone(), out.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          if !worker.emit(&out, mp(t)).await {
            break;
          }
        }
      }
    },
    move || closer.close(),
  );

  pull
}

/// Applies a fallible `mp` to every item of `input`.
///
/// Successes go to the first returned channel, failures to the second. Both
/// close once every worker has finished. Items on the two channels are not
/// ordered relative to each other.
pub fn map_with_error<T, N, E, F>(
  config: &StageConfig,
  mp: F,
  input: ChanPull<T>,
) -> (ChanPull<N>, ChanPull<E>)
where
  T: Send + 'static,
  N: Send + 'static,
  E: Send + 'static,
  F: Fn(T) -> Result<N, E> + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let (errs, err_pull) = Chan::new(config.size()).split();
  let (out_closer, err_closer) = (out.clone(), errs.clone());
  let mp = Arc::new(mp);

  WorkerGroup::new(config, "map").spawn(
    move |worker| {
      let (mp, input, out, errs) = (Arc::clone(&mp), input.clone(), out.clone(), errs.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          let emitted = match mp(t) {
            Ok(n) => worker.emit(&out, n).await,
            Err(e) => worker.emit(&errs, e).await,
          };
          if !emitted {
            break;
          }
        }
      }
    },
    move || {
      out_closer.close();
      err_closer.close();
    },
  );

  (pull, err_pull)
}

/// Applies a fallible `mp` to every item of `input`, reporting failures to
/// `sink` on the worker that hit them.
pub fn map_with_error_sink<T, N, E, F, S>(
  config: &StageConfig,
  mp: F,
  sink: S,
  input: ChanPull<T>,
) -> ChanPull<N>
where
  T: Send + 'static,
  N: Send + 'static,
  E: Send + 'static,
  F: Fn(T) -> Result<N, E> + Send + Sync + 'static,
  S: Fn(E) + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();
  let mp = Arc::new(mp);
  let sink = Arc::new(sink);

  WorkerGroup::new(config, "map").spawn(
    move |worker| {
      let (mp, sink, input, out) = (Arc::clone(&mp), Arc::clone(&sink), input.clone(), out.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          match mp(t) {
            Ok(n) => {
              if !worker.emit(&out, n).await {
                break;
              }
            }
            Err(e) => sink(e),
          }
        }
      }
    },
    move || closer.close(),
  );

  pull
}
