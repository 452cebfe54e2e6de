//! # Sink
//!
//! Terminal stages that consume a channel without producing items.
//!
//! [`sink`] and [`sink_with_error_sink`] consume on the caller's task and
//! return once the input is closed and drained. [`sink_with_error`] consumes on
//! a worker pool and reports failures on a channel instead.

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::sync::Arc;
use tracing::trace;

/// Calls `consume` on every item until `input` is closed and drained.
pub async fn sink<T, F>(mut consume: F, input: ChanPull<T>)
where
  F: FnMut(T),
{
  let mut consumed = 0usize;
  while let Some(t) = input.pull_safe().await {
    consume(t);
    consumed += 1;
  }
  trace!(consumed, "sink drained");
}

/// Consumes `input` on a worker pool, emitting every error `consume` returns.
///
/// Each item is consumed exactly once. The returned channel closes once the
/// input is drained and every worker has finished.
pub fn sink_with_error<T, E, F>(config: &StageConfig, consume: F, input: ChanPull<T>) -> ChanPull<E>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
{
  let (errs, err_pull) = Chan::new(config.size()).split();
  let closer = errs.clone();
  let consume = Arc::new(consume);

  WorkerGroup::new(config, "sink").spawn(
    move |worker| {
      let (consume, input, errs) = (Arc::clone(&consume), input.clone(), errs.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          if let Err(e) = consume(t) {
            if !worker.emit(&errs, e).await {
              break;
            }
          }
        }
      }
    },
    move || closer.close(),
  );

  err_pull
}

/// Calls `consume` on every item, passing its errors to `errors`, until
/// `input` is closed and drained.
pub async fn sink_with_error_sink<T, E, F, S>(mut consume: F, mut errors: S, input: ChanPull<T>)
where
  F: FnMut(T) -> Result<(), E>,
  S: FnMut(E),
{
  while let Some(t) = input.pull_safe().await {
    if let Err(e) = consume(t) {
      errors(e);
    }
  }
}
