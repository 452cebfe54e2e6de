//! # Fan-Out
//!
//! Broadcasts every item of one channel to several freshly created channels.
//!
//! A single worker pushes each item to the outputs one after another, so a
//! slow consumer on any output stalls all of them once its buffer is full.

use crate::chan::{Chan, ChanPull, ChanPush};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;

/// Copies every item of `input` onto each of `count` new channels.
///
/// Every output sees the items in input order. All outputs close together
/// when the input is closed and drained.
pub fn fan_out<T>(config: &StageConfig, count: usize, input: ChanPull<T>) -> Vec<ChanPull<T>>
where
  T: Clone + Send + 'static,
{
  let (outs, pulls): (Vec<ChanPush<T>>, Vec<ChanPull<T>>) =
    (0..count).map(|_| Chan::new(config.size()).split()).unzip();
  let closers = outs.clone();

  WorkerGroup::new(config, "fan_out").spawn_one(
    move |worker| async move {
      while let Some(t) = worker.next(&input).await {
        let Some((last, rest)) = outs.split_last() else {
          continue;
        };
        for out in rest {
          if !worker.emit(out, t.clone()).await {
            return;
          }
        }
        if !worker.emit(last, t).await {
          return;
        }
      }
    },
    move || closers.iter().for_each(ChanPush::close),
  );

  pulls
}
