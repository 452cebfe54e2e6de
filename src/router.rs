//! # Router
//!
//! Partitions a channel by key. A classifier derives a key from each item; the
//! item goes to the output registered for that key, or to a fallback when no
//! output matches.
//!
//! Outputs are created before the worker starts, so consumers may pull from
//! them right away. When a key is listed more than once, the last listing
//! receives the items and the earlier ones only close.
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig, router};
//!
//! # tokio_test::block_on(async {
//! let (feed, input) = Chan::new(4).split();
//! let (routes, rest) = router(
//!   &StageConfig::new(1, 4),
//!   vec!['a', 'b'],
//!   |word: &&str| word.chars().next().unwrap_or_default(),
//!   input,
//! );
//!
//! for word in ["apple", "banana", "cherry"] {
//!   feed.push(word).await;
//! }
//! feed.close();
//!
//! assert_eq!(routes[0].pull_safe().await, Some("apple"));
//! assert_eq!(routes[1].pull_safe().await, Some("banana"));
//! assert_eq!(rest.pull_safe().await, Some("cherry"));
//! # });
//! ```

use crate::chan::{Chan, ChanPull, ChanPush};
use crate::config::StageConfig;
use crate::worker::WorkerGroup;
use std::collections::HashMap;
use std::hash::Hash;

/// Output channels keyed by the route they serve.
struct RouteTable<K, T> {
  routes: HashMap<K, usize>,
  outs: Vec<ChanPush<T>>,
}

impl<K, T> RouteTable<K, T>
where
  K: Eq + Hash,
{
  fn new(size: usize, matches: Vec<K>) -> (Self, Vec<ChanPull<T>>) {
    let mut routes = HashMap::with_capacity(matches.len());
    let mut outs = Vec::with_capacity(matches.len());
    let mut pulls = Vec::with_capacity(matches.len());
    for (index, key) in matches.into_iter().enumerate() {
      let (out, pull) = Chan::new(size).split();
      routes.insert(key, index);
      outs.push(out);
      pulls.push(pull);
    }
    (Self { routes, outs }, pulls)
  }

  fn route(&self, key: &K) -> Option<&ChanPush<T>> {
    self.routes.get(key).map(|&index| &self.outs[index])
  }

  fn closers(&self) -> Vec<ChanPush<T>> {
    self.outs.clone()
  }
}

/// Sends each item of `input` to the output whose entry in `matches` equals
/// `classify(&item)`, or to the returned fallback channel when none does.
///
/// Outputs are returned in the order of `matches`. All of them, the fallback
/// included, close together when `input` is closed and drained.
pub fn router<T, K, C>(
  config: &StageConfig,
  matches: Vec<K>,
  mut classify: C,
  input: ChanPull<T>,
) -> (Vec<ChanPull<T>>, ChanPull<T>)
where
  T: Send + 'static,
  K: Eq + Hash + Send + 'static,
  C: FnMut(&T) -> K + Send + 'static,
{
  let (table, pulls) = RouteTable::new(config.size(), matches);
  let (or_else, or_else_pull) = Chan::new(config.size()).split();
  let closers = table.closers();
  let or_else_closer = or_else.clone();

  WorkerGroup::new(config, "router").spawn_one(
    move |worker| async move {
      while let Some(t) = worker.next(&input).await {
        let out = table.route(&classify(&t)).unwrap_or(&or_else);
        if !worker.emit(out, t).await {
          break;
        }
      }
    },
    move || {
      closers.iter().for_each(ChanPush::close);
      or_else_closer.close();
    },
  );

  (pulls, or_else_pull)
}

/// Like [`router`], but unmatched items are passed to `or_else` instead of a
/// fallback channel.
pub fn router_with_sink<T, K, C, S>(
  config: &StageConfig,
  matches: Vec<K>,
  mut classify: C,
  mut or_else: S,
  input: ChanPull<T>,
) -> Vec<ChanPull<T>>
where
  T: Send + 'static,
  K: Eq + Hash + Send + 'static,
  C: FnMut(&T) -> K + Send + 'static,
  S: FnMut(T) + Send + 'static,
{
  let (table, pulls) = RouteTable::new(config.size(), matches);
  let closers = table.closers();

  WorkerGroup::new(config, "router").spawn_one(
    move |worker| async move {
      while let Some(t) = worker.next(&input).await {
        match table.route(&classify(&t)) {
          Some(out) => {
            if !worker.emit(out, t).await {
              break;
            }
          }
          None => or_else(t),
        }
      }
    },
    move || closers.iter().for_each(ChanPush::close),
  );

  pulls
}
