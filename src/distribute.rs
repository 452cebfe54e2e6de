//! # Distribute
//!
//! Partitions one channel across several outputs. Unlike
//! [`fan_out`](crate::fan_out()), every item goes to exactly one output.
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig, distribute};
//!
//! # tokio_test::block_on(async {
//! let (feed, input) = Chan::new(4).split();
//! let parity = distribute(&StageConfig::new(1, 4), 2, |x: &u32| (x % 2) as usize, input);
//!
//! for x in [1, 2, 3, 4] {
//!   feed.push(x).await;
//! }
//! feed.close();
//!
//! assert_eq!(parity[0].pull_safe().await, Some(2));
//! assert_eq!(parity[1].pull_safe().await, Some(1));
//! # });
//! ```

use crate::chan::{Chan, ChanPull, ChanPush};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;

/// Sends each item of `input` to the output chosen by `select`.
///
/// Returns no channels when `count` is zero, in which case `input` is left
/// untouched.
///
/// # Panics
///
/// The stage panics, closing all outputs, if `select` returns an index
/// outside `0..count`.
pub fn distribute<T, S>(config: &StageConfig, count: usize, select: S, input: ChanPull<T>) -> Vec<ChanPull<T>>
where
  T: Send + 'static,
  S: FnMut(&T) -> usize + Send + 'static,
{
  partition(config, "distribute", count, select, input)
}

/// Deals the items of `input` to `count` outputs in turn, starting with the
/// first output.
///
/// With `m` items and `m` a multiple of `count`, each output receives exactly
/// `m / count` items.
pub fn round_robin<T>(config: &StageConfig, count: usize, input: ChanPull<T>) -> Vec<ChanPull<T>>
where
  T: Send + 'static,
{
  let mut next = 0;
  let select = move |_: &T| {
    let chosen = next;
    next = (next + 1) % count;
    chosen
  };
  partition(config, "round_robin", count, select, input)
}

fn partition<T, S>(
  config: &StageConfig,
  kind: &str,
  count: usize,
  mut select: S,
  input: ChanPull<T>,
) -> Vec<ChanPull<T>>
where
  T: Send + 'static,
  S: FnMut(&T) -> usize + Send + 'static,
{
  if count < 1 {
    return Vec::new();
  }

  let (outs, pulls): (Vec<ChanPush<T>>, Vec<ChanPull<T>>) =
    (0..count).map(|_| Chan::new(config.size()).split()).unzip();
  let closers = outs.clone();

  WorkerGroup::new(config, kind).spawn_one(
    move |worker| async move {
      while let Some(t) = worker.next(&input).await {
        let index = select(&t);
        let Some(out) = outs.get(index) else {
          panic!("{}: selector chose output {index} of {}", worker.stage(), outs.len());
        };
        if !worker.emit(out, t).await {
          break;
        }
      }
    },
    move || closers.iter().for_each(ChanPush::close),
  );

  pulls
}
