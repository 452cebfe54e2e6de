//! # Reduce and Window
//!
//! Folding stages.
//!
//! - [`reduce`] folds a channel to a single value on the caller's task.
//! - [`reduce_and_emit`] runs the same fold in the background and emits the
//!   result on a single-slot channel.
//! - [`window`] folds continuously and flushes the running accumulator every
//!   period, plus once more when the input ends.
//!
//! ## Window
//!
//! A window stage is either running or terminated. While running it waits for
//! whichever comes first:
//!
//! - **a tick**: the accumulator is emitted and replaced with a fresh one from
//!   the `zero` constructor;
//! - **an item**: it is folded into the accumulator;
//! - **end of input**: the accumulator is emitted as the terminal flush and the
//!   output closes. This is the only regular way a window terminates.
//!
//! A tick that is due wins over a waiting item, so data arriving faster than
//! the stage folds it cannot starve the periodic flush. The terminal flush is
//! emitted even when nothing arrived since the last tick, so `zero` must build
//! a meaningful empty value. A cancelled window closes its output without a
//! terminal flush.
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig, window};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let (feed, input) = Chan::new(8).split();
//! let sums = window(
//!   &StageConfig::new(1, 4),
//!   Duration::from_secs(60),
//!   |x: u32, acc: u32| acc + x,
//!   || 0,
//!   input,
//! );
//!
//! for x in [1, 2, 3] {
//!   feed.push(x).await;
//! }
//! feed.close();
//!
//! assert_eq!(sums.pull_safe().await, Some(6));
//! assert_eq!(sums.pull_safe().await, None);
//! # });
//! ```

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::trace;

/// Folds every item of `input` into `acc` and returns the result once the
/// input is closed and drained.
///
/// An empty input returns `acc` unchanged.
pub async fn reduce<T, Acc, F>(mut fold: F, mut acc: Acc, input: ChanPull<T>) -> Acc
where
  F: FnMut(T, Acc) -> Acc,
{
  while let Some(t) = input.pull_safe().await {
    acc = fold(t, acc);
  }
  acc
}

/// Runs [`reduce`] in the background.
///
/// The returned channel has a single slot: it receives exactly one value, the
/// final accumulator, and then closes.
pub fn reduce_and_emit<T, Acc, F>(fold: F, acc: Acc, input: ChanPull<T>) -> ChanPull<Acc>
where
  T: Send + 'static,
  Acc: Send + 'static,
  F: FnMut(T, Acc) -> Acc + Send + 'static,
{
  let (out, pull) = Chan::new(1).split();
  let closer = out.clone();

  WorkerGroup::new(&StageConfig::default(), "reduce").spawn_one(
    move |worker| async move {
      let acc = reduce(fold, acc, input).await;
      worker.emit(&out, acc).await;
    },
    move || closer.close(),
  );

  pull
}

/// Folds `input` with `fold`, emitting the accumulator every `period` and once
/// more when the input is closed and drained.
///
/// The first flush happens one `period` after the call.
///
/// # Panics
///
/// Panics if `period` is zero.
pub fn window<T, Acc, F, Z>(
  config: &StageConfig,
  period: Duration,
  mut fold: F,
  zero: Z,
  input: ChanPull<T>,
) -> ChanPull<Acc>
where
  T: Send + 'static,
  Acc: Send + 'static,
  F: FnMut(T, Acc) -> Acc + Send + 'static,
  Z: Fn() -> Acc + Send + 'static,
{
  assert!(!period.is_zero(), "window period must be non-zero");

  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();

  WorkerGroup::new(config, "window").spawn_one(
    move |worker| async move {
      let mut acc = zero();
      let mut folded = 0usize;
      let mut ticker = interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
        tokio::select! {
          biased;
          () = worker.cancelled() => return,
          _ = ticker.tick() => {
            let flushed = std::mem::replace(&mut acc, zero());
            trace!(stage = worker.stage(), folded, "window flush");
            folded = 0;
            if !worker.emit(&out, flushed).await {
              return;
            }
          }
          item = input.pull_safe() => match item {
            Some(t) => {
              acc = fold(t, acc);
              folded += 1;
            }
            None => {
              trace!(stage = worker.stage(), folded, "window terminal flush");
              worker.emit(&out, acc).await;
              return;
            }
          },
        }
      }
    },
    move || closer.close(),
  );

  pull
}
