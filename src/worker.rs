//! # Worker Pools
//!
//! Every stage runs the same coordination pattern: a coordinator task spawns
//! `count - 1` workers, then runs the last worker body itself instead of only
//! waiting. Once all workers have returned, the coordinator closes the stage's
//! outputs exactly once.
//!
//! Closing happens from a drop guard, so a panicking worker still ends the
//! stage's output streams and downstream stages do not hang. When the inline
//! worker panics, the spawned workers are aborted and awaited before the
//! outputs close. The panic is then resumed on the coordinator task.
//!
//! ## Example
//!
//! A custom stage built on [`WorkerGroup`]:
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig, WorkerGroup};
//!
//! # tokio_test::block_on(async {
//! let (feed, input) = Chan::<&str>::new(4).split();
//! let (out, output) = Chan::new(4).split();
//! let closer = out.clone();
//!
//! WorkerGroup::new(&StageConfig::new(2, 4), "length").spawn(
//!   move |worker| {
//!     let (input, out) = (input.clone(), out.clone());
//!     async move {
//!       while let Some(s) = worker.next(&input).await {
//!         if !worker.emit(&out, s.len()).await {
//!           break;
//!         }
//!       }
//!     }
//!   },
//!   move || closer.close(),
//! );
//!
//! feed.push("abc").await;
//! feed.close();
//! assert_eq!(output.pull_safe().await, Some(3));
//! assert_eq!(output.pull_safe().await, None);
//! # });
//! ```

use crate::chan::{ChanPull, ChanPush};
use crate::config::StageConfig;
use futures::FutureExt;
use scopeguard::ScopeGuard;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Handle given to each worker body.
///
/// Wraps pulls and pushes so that they give up as soon as the stage is
/// cancelled.
#[derive(Debug, Clone)]
pub struct Worker {
  id: usize,
  stage: Arc<str>,
  cancel: CancellationToken,
}

impl Worker {
  /// Index of this worker within its group. The inline worker is `0`.
  pub fn id(&self) -> usize {
    self.id
  }

  /// Name of the stage this worker belongs to.
  pub fn stage(&self) -> &str {
    &self.stage
  }

  /// Pulls the next item, or `None` when the input is closed and drained or
  /// the stage was cancelled.
  pub async fn next<T>(&self, input: &ChanPull<T>) -> Option<T> {
    tokio::select! {
      biased;
      () = self.cancel.cancelled() => None,
      item = input.pull_safe() => item,
    }
  }

  /// Pushes an item. Returns `false`, dropping the item, if the stage was
  /// cancelled first.
  pub async fn emit<T>(&self, output: &ChanPush<T>, item: T) -> bool {
    tokio::select! {
      biased;
      () = self.cancel.cancelled() => false,
      () = output.push(item) => true,
    }
  }

  /// Completes once the stage is cancelled.
  pub async fn cancelled(&self) {
    self.cancel.cancelled().await;
  }

  /// Whether the stage was cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

/// Counted group of workers attached to one stage instance.
#[derive(Debug)]
pub struct WorkerGroup {
  stage: Arc<str>,
  count: usize,
  cancel: CancellationToken,
}

impl WorkerGroup {
  /// Creates a group sized by `config`, named after `config` or `kind`.
  pub fn new(config: &StageConfig, kind: &str) -> Self {
    Self {
      stage: Arc::from(config.name_or(kind)),
      count: config.workers(),
      cancel: config.cancellation().clone(),
    }
  }

  /// Overrides the worker count. Values below one are treated as one.
  #[must_use]
  pub fn with_count(mut self, count: usize) -> Self {
    self.count = count.max(1);
    self
  }

  /// Number of workers the group will run.
  pub fn count(&self) -> usize {
    self.count
  }

  /// Spawns the coordinator task running `work` on every worker, then `close`
  /// once all of them have returned.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn spawn<W, Fut, C>(self, work: W, close: C) -> JoinHandle<()>
  where
    W: Fn(Worker) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    tokio::spawn(self.coordinate(work, close))
  }

  /// Spawns a single worker running `work`, then `close`.
  ///
  /// Used by stages whose body owns mutable state (selectors, folds, sources)
  /// and therefore cannot be shared between workers.
  pub fn spawn_one<W, Fut, C>(self, work: W, close: C) -> JoinHandle<()>
  where
    W: FnOnce(Worker) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    tokio::spawn(async move {
      let _closer = close_guard(Arc::clone(&self.stage), close);
      debug!(stage = %self.stage, workers = 1, "stage started");
      work(self.worker(0)).await;
      self.finished();
    })
  }

  async fn coordinate<W, Fut, C>(self, work: W, close: C)
  where
    W: Fn(Worker) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
    C: FnOnce(),
  {
    let _closer = close_guard(Arc::clone(&self.stage), close);
    debug!(stage = %self.stage, workers = self.count, "stage started");

    let mut workers = JoinSet::new();
    for id in 1..self.count {
      workers.spawn(work(self.worker(id)));
    }

    // This task is the last worker.
    let mut panicked = AssertUnwindSafe(work(self.worker(0))).catch_unwind().await.err();

    // Outputs stay open until every spawned worker has stopped.
    if panicked.is_some() {
      workers.abort_all();
    }
    while let Some(joined) = workers.join_next().await {
      if let Err(err) = joined {
        if err.is_panic() && panicked.is_none() {
          panicked = Some(err.into_panic());
        }
      }
    }

    if let Some(payload) = panicked {
      error!(stage = %self.stage, "worker panicked");
      panic::resume_unwind(payload);
    }
    self.finished();
  }

  fn worker(&self, id: usize) -> Worker {
    Worker {
      id,
      stage: Arc::clone(&self.stage),
      cancel: self.cancel.clone(),
    }
  }

  fn finished(&self) {
    if self.cancel.is_cancelled() {
      warn!(stage = %self.stage, "stage cancelled");
    } else {
      debug!(stage = %self.stage, "stage finished");
    }
  }
}

fn close_guard<C: FnOnce()>(stage: Arc<str>, close: C) -> ScopeGuard<C, impl FnOnce(C)> {
  scopeguard::guard(close, move |close| {
    close();
    debug!(stage = %stage, "stage outputs closed");
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chan::Chan;
  use std::collections::HashSet;
  use std::sync::Mutex;
  use std::time::Duration;

  #[tokio::test]
  async fn test_runs_requested_number_of_workers() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let (done, finished) = Chan::new(1).split();
    let record = Arc::clone(&seen);

    WorkerGroup::new(&StageConfig::new(4, 0), "count").spawn(
      move |worker| {
        let record = Arc::clone(&record);
        async move {
          record.lock().unwrap().insert(worker.id());
        }
      },
      move || done.close(),
    );

    assert_eq!(finished.pull_safe().await, None::<()>);
    let ids = seen.lock().unwrap().clone();
    assert_eq!(ids, (0..4).collect::<HashSet<_>>());
  }

  #[tokio::test]
  async fn test_zero_workers_runs_inline_worker() {
    let group = WorkerGroup::new(&StageConfig::new(0, 0), "inline");
    assert_eq!(group.count(), 1);
    assert_eq!(group.with_count(0).count(), 1);

    let (done, finished) = Chan::<()>::new(1).split();
    let (hits, counted) = Chan::new(4).split();
    WorkerGroup::new(&StageConfig::new(0, 0), "inline").spawn(
      move |worker| {
        let hits = hits.clone();
        async move { hits.push(worker.id()).await }
      },
      move || done.close(),
    );
    finished.drain().await;
    assert_eq!(counted.try_pull(), Ok(0));
    assert!(counted.is_empty());
  }

  #[tokio::test]
  async fn test_closes_outputs_when_worker_panics() {
    let (out, pull) = Chan::<i32>::new(1).split();
    let closer = out.clone();
    let handle = WorkerGroup::new(&StageConfig::new(3, 0), "boom").spawn(
      move |worker| async move {
        if worker.id() == 2 {
          panic!("worker failure");
        }
      },
      move || closer.close(),
    );

    assert_eq!(pull.pull_safe().await, None);
    assert!(out.is_closed());
    assert!(handle.await.unwrap_err().is_panic());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_inline_panic_waits_for_running_workers() {
    let (out, pull) = Chan::new(4).split();
    let (started, ready) = Chan::new(1).split();
    let closer = out.clone();

    let handle = WorkerGroup::new(&StageConfig::new(2, 4), "slow").spawn(
      move |worker| {
        let (out, started, ready) = (out.clone(), started.clone(), ready.clone());
        async move {
          if worker.id() == 0 {
            let _ = ready.pull_safe().await;
            panic!("inline worker failure");
          }
          started.try_push(()).unwrap();
          // Busy in synchronous code while the inline worker fails.
          std::thread::sleep(Duration::from_millis(50));
          out.push(7).await;
        }
      },
      move || closer.close(),
    );

    assert_eq!(pull.pull_safe().await, Some(7));
    assert_eq!(pull.pull_safe().await, None);
    assert!(handle.await.unwrap_err().is_panic());
  }

  #[tokio::test]
  async fn test_cancelled_worker_stops_pulling() {
    let config = StageConfig::new(1, 0);
    let (feed, input) = Chan::<i32>::new(4).split();
    feed.push(1).await;

    let worker = WorkerGroup::new(&config, "cancel").worker(0);
    config.cancellation().cancel();
    assert!(worker.is_cancelled());
    assert_eq!(worker.next(&input).await, None);

    let (out, _pull) = Chan::new(0).split();
    assert!(!worker.emit(&out, 1).await);
  }

  #[test]
  fn test_worker_carries_stage_name() {
    let group = WorkerGroup::new(&StageConfig::default().with_name("hash"), "map");
    let worker = group.worker(3);
    assert_eq!(worker.stage(), "hash");
    assert_eq!(worker.id(), 3);
  }
}
