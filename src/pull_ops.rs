//! # Chaining
//!
//! Method forms of the stage functions, so a pipeline reads top to bottom:
//!
//! ```rust
//! use pipeweave::{Chan, StageConfig};
//!
//! # tokio_test::block_on(async {
//! let config = StageConfig::new(1, 8);
//! let (feed, input) = Chan::new(8).split();
//!
//! let evens = input
//!   .map(&config, |x: u64| x * 3)
//!   .filter(&config, |x| x % 2 == 0);
//!
//! for x in 1..=4 {
//!   feed.push(x).await;
//! }
//! feed.close();
//!
//! let mut seen = Vec::new();
//! evens.sink(|x| seen.push(x)).await;
//! assert_eq!(seen, vec![6, 12]);
//! # });
//! ```
//!
//! Every method is fully typed and consumes the pull end it is called on. Clone
//! the pull end first to attach several stages to one channel; they will then
//! compete for items.

use crate::chan::ChanPull;
use crate::config::StageConfig;
use crate::{fan_out, filter, map, reduce, sink, tap};

impl<T> ChanPull<T>
where
  T: Send + 'static,
{
  /// See [`map::map`].
  pub fn map<N, F>(self, config: &StageConfig, mp: F) -> ChanPull<N>
  where
    N: Send + 'static,
    F: Fn(T) -> N + Send + Sync + 'static,
  {
    map::map(config, mp, self)
  }

  /// See [`map::map_with_error`].
  pub fn map_with_error<N, E, F>(self, config: &StageConfig, mp: F) -> (ChanPull<N>, ChanPull<E>)
  where
    N: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<N, E> + Send + Sync + 'static,
  {
    map::map_with_error(config, mp, self)
  }

  /// See [`map::map_with_error_sink`].
  pub fn map_with_error_sink<N, E, F, S>(self, config: &StageConfig, mp: F, sink: S) -> ChanPull<N>
  where
    N: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Result<N, E> + Send + Sync + 'static,
    S: Fn(E) + Send + Sync + 'static,
  {
    map::map_with_error_sink(config, mp, sink, self)
  }

  /// See [`filter::filter`].
  pub fn filter<F>(self, config: &StageConfig, keep: F) -> ChanPull<T>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    filter::filter(config, keep, self)
  }

  /// See [`filter::filter_with_error`].
  pub fn filter_with_error<E, F>(self, config: &StageConfig, keep: F) -> (ChanPull<T>, ChanPull<E>)
  where
    E: Send + 'static,
    F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
  {
    filter::filter_with_error(config, keep, self)
  }

  /// See [`filter::filter_with_error_sink`].
  pub fn filter_with_error_sink<E, F, S>(self, config: &StageConfig, keep: F, sink: S) -> ChanPull<T>
  where
    E: Send + 'static,
    F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
    S: Fn(E) + Send + Sync + 'static,
  {
    filter::filter_with_error_sink(config, keep, sink, self)
  }

  /// See [`tap::tap`].
  pub fn tap<F>(self, config: &StageConfig, f: F) -> ChanPull<T>
  where
    F: Fn(T) -> T + Send + Sync + 'static,
  {
    tap::tap(config, f, self)
  }

  /// See [`tap::tap_with_error`].
  pub fn tap_with_error<E, F>(self, config: &StageConfig, f: F) -> (ChanPull<T>, ChanPull<E>)
  where
    E: Send + 'static,
    F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
  {
    tap::tap_with_error(config, f, self)
  }

  /// See [`tap::tap_with_error_sink`].
  pub fn tap_with_error_sink<E, F, S>(self, config: &StageConfig, f: F, sink: S) -> ChanPull<T>
  where
    E: Send + 'static,
    F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
    S: Fn(E) + Send + Sync + 'static,
  {
    tap::tap_with_error_sink(config, f, sink, self)
  }

  /// See [`sink::sink`].
  pub async fn sink<F>(self, consume: F)
  where
    F: FnMut(T),
  {
    sink::sink(consume, self).await;
  }

  /// See [`sink::sink_with_error`].
  pub fn sink_with_error<E, F>(self, config: &StageConfig, consume: F) -> ChanPull<E>
  where
    E: Send + 'static,
    F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
  {
    sink::sink_with_error(config, consume, self)
  }

  /// See [`sink::sink_with_error_sink`].
  pub async fn sink_with_error_sink<E, F, S>(self, consume: F, errors: S)
  where
    F: FnMut(T) -> Result<(), E>,
    S: FnMut(E),
  {
    sink::sink_with_error_sink(consume, errors, self).await;
  }

  /// See [`fan_out::fan_out`].
  pub fn fan_out(self, config: &StageConfig, count: usize) -> Vec<ChanPull<T>>
  where
    T: Clone,
  {
    fan_out::fan_out(config, count, self)
  }

  /// See [`reduce::reduce`].
  pub async fn reduce<Acc, F>(self, fold: F, acc: Acc) -> Acc
  where
    F: FnMut(T, Acc) -> Acc,
  {
    reduce::reduce(fold, acc, self).await
  }
}
