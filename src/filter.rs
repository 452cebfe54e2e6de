//! # Filter
//!
//! Keep-or-drop stages backed by a worker pool. Each item produces zero or one
//! output item.

use crate::chan::{Chan, ChanPull};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::sync::Arc;

/// Forwards the items of `input` for which `keep` returns `true`.
pub fn filter<T, F>(config: &StageConfig, keep: F, input: ChanPull<T>) -> ChanPull<T>
where
  T: Send + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();
  let keep = Arc::new(keep);

  WorkerGroup::new(config, "filter").spawn(
    move |worker| {
      let (keep, input, out) = (Arc::clone(&keep), input.clone(), out.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          if keep(&t) && !worker.emit(&out, t).await {
            break;
          }
        }
      }
    },
    move || closer.close(),
  );

  pull
}

/// Forwards the items of `input` for which a fallible `keep` returns
/// `Ok(true)`; failures go to the second returned channel.
pub fn filter_with_error<T, E, F>(
  config: &StageConfig,
  keep: F,
  input: ChanPull<T>,
) -> (ChanPull<T>, ChanPull<E>)
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let (errs, err_pull) = Chan::new(config.size()).split();
  let (out_closer, err_closer) = (out.clone(), errs.clone());
  let keep = Arc::new(keep);

  WorkerGroup::new(config, "filter").spawn(
    move |worker| {
      let (keep, input, out, errs) = (Arc::clone(&keep), input.clone(), out.clone(), errs.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          let emitted = match keep(&t) {
            Ok(true) => worker.emit(&out, t).await,
            Ok(false) => true,
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

/// Like [`filter_with_error`], but failures are passed to `sink`.
pub fn filter_with_error_sink<T, E, F, S>(
  config: &StageConfig,
  keep: F,
  sink: S,
  input: ChanPull<T>,
) -> ChanPull<T>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
  S: Fn(E) + Send + Sync + 'static,
{
  let (out, pull) = Chan::new(config.size()).split();
  let closer = out.clone();
  let keep = Arc::new(keep);
  let sink = Arc::new(sink);

  WorkerGroup::new(config, "filter").spawn(
    move |worker| {
      let (keep, sink, input, out) = (Arc::clone(&keep), Arc::clone(&sink), input.clone(), out.clone());
      async move {
        while let Some(t) = worker.next(&input).await {
          match keep(&t) {
            Ok(true) => {
              if !worker.emit(&out, t).await {
                break;
              }
            }
            Ok(false) => {}
            Err(e) => sink(e),
          }
        }
      }
    },
    move || closer.close(),
  );

  pull
}
