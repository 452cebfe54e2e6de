//! # Fan-In
//!
//! Merges several channels into one. Each input gets its own worker that
//! forwards items verbatim; the first input is served by the coordinator task
//! itself. Items from different inputs interleave in whatever order the
//! scheduler runs the workers.

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::sync::Arc;

/// Merges `inputs` into a single channel that closes once every input is
/// closed and drained.
///
/// The worker count of `config` is ignored: there is one worker per input.
/// With no inputs the returned channel is already closed.
pub fn fan_in<T>(config: &StageConfig, inputs: Vec<ChanPull<T>>) -> ChanPull<T>
where
  T: Send + 'static,
{
  if inputs.is_empty() {
    return ChanPull::closed();
  }

  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();
  let inputs: Arc<[ChanPull<T>]> = inputs.into();

  WorkerGroup::new(config, "fan_in").with_count(inputs.len()).spawn(
    move |worker| {
      let (input, out) = (inputs[worker.id()].clone(), out.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          if !worker.emit(&out, t).await {
            break;
          }
        }
      }
    },
    move || closer.close(),
  );

  pull
}
