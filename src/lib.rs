//! # pipeweave
//!
//! Composable concurrent stream stages over bounded, closable channels.
//!
//! pipeweave lets you assemble pipelines out of stages connected by
//! [`Chan`]nels without writing the worker-pool plumbing for every stage.
//! Each stage consumes one or more pull ends, spawns its workers on the Tokio
//! runtime, and hands back the pull ends of the channels it owns. A stage
//! closes its outputs once its inputs are closed and drained, so closing the
//! head of a pipeline shuts the whole pipeline down stage by stage.
//!
//! ## Key Features
//!
//! - **Typed channels**: bounded FIFO queues with separate producer
//!   ([`ChanPush`]) and consumer ([`ChanPull`]) ends; only producers can close.
//! - **Worker pools**: [`map()`], [`filter()`], [`tap()`] and
//!   [`sink_with_error`] run `n` workers, one of them on the coordinator task.
//! - **Error routing**: every fallible stage comes as `*_with_error` (errors on
//!   their own channel) and `*_with_error_sink` (errors to a callback).
//! - **Topology**: [`fan_in`], [`fan_out()`], [`distribute()`],
//!   [`round_robin`], [`router()`] and [`router_with_sink`].
//! - **Folding**: [`reduce()`], [`reduce_and_emit`] and the timer driven
//!   [`window`].
//! - **Cancellation**: every [`StageConfig`] carries a cancellation token that
//!   stops the stage and closes its outputs.
//!
//! ## Quick Start
//!
//! ```rust
//! use pipeweave::{Repeat, StageConfig, source};
//!
//! # tokio_test::block_on(async {
//! let config = StageConfig::new(4, 16);
//!
//! let mut n = 0u64;
//! let total = source(&config, Repeat::Times(100), move || {
//!   n += 1;
//!   n
//! })
//! .map(&config, |n| n * n)
//! .filter(&config, |n| n % 2 == 1)
//! .reduce(|n, acc| acc + n, 0u64)
//! .await;
//!
//! assert_eq!(total, (1..=100u64).filter(|n| n % 2 == 1).map(|n| n * n).sum::<u64>());
//! # });
//! ```
//!
//! ## Ordering
//!
//! A stage with one worker preserves input order. With several workers, items
//! go to whichever worker pulls first and output order is not guaranteed.
//!
//! ## Logging
//!
//! Stages emit `tracing` records (`debug` on start and finish, `warn` on
//! cancellation, `error` when a worker panics) tagged with the stage name. The
//! crate never installs a subscriber.

#![deny(missing_docs)]

/// Bounded, closable channels.
pub mod chan;
/// Stage configuration.
pub mod config;
/// Merge several inputs.
pub mod fan_in;
/// Broadcast to several outputs.
pub mod fan_out;
/// Selector and round-robin partitioning.
pub mod distribute;
/// Channel errors.
pub mod error;
/// Keep-or-drop stages.
pub mod filter;
/// One-to-one transform stages.
pub mod map;
/// Method forms of the stages on [`ChanPull`].
pub mod pull_ops;
/// Blocking fold, background fold and timed windows.
pub mod reduce;
/// Key-based partitioning.
pub mod router;
/// Terminal stages.
pub mod sink;
/// Entry stages.
pub mod source;
/// Pass-through stages.
pub mod tap;
/// Worker-pool coordination shared by every stage.
pub mod worker;

pub use chan::{Chan, ChanPull, ChanPush};
pub use config::StageConfig;
pub use distribute::{distribute, round_robin};
pub use error::{TryPullError, TryPushError};
pub use fan_in::fan_in;
pub use fan_out::fan_out;
pub use filter::{filter, filter_with_error, filter_with_error_sink};
pub use map::{map, map_with_error, map_with_error_sink};
pub use reduce::{reduce, reduce_and_emit, window};
pub use router::{router, router_with_sink};
pub use sink::{sink, sink_with_error, sink_with_error_sink};
pub use source::{Repeat, source, source_with_error, source_with_error_sink};
pub use tap::{tap, tap_with_error, tap_with_error_sink};
pub use worker::{Worker, WorkerGroup};

#[cfg(test)]
mod topology_test;
