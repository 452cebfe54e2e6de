//! # Channels
//!
//! Bounded, closable, typed FIFO channels used as the only link between
//! pipeline stages.
//!
//! A channel has three kinds of handle sharing one buffer:
//!
//! - [`Chan<T>`]: the bidirectional handle returned by [`Chan::new`]. Whoever
//!   creates the channel owns it and hands out the two ends.
//! - [`ChanPush<T>`]: the producer end. It can push and close.
//! - [`ChanPull<T>`]: the consumer end. It can pull but never close, so a
//!   consumer cannot end a stream it does not own.
//!
//! All handles are cheap to clone and every clone refers to the same channel.
//! Several producers may push into one channel and several consumers may pull
//! from it; each value is delivered to exactly one consumer.
//!
//! ## Capacity
//!
//! A channel with capacity `n > 0` buffers up to `n` values. A channel with
//! capacity `0` is a rendezvous: [`push`](ChanPush::push) only completes once a
//! consumer has taken the value.
//!
//! ## Closing
//!
//! [`close`](ChanPush::close) is idempotent. Values pushed before closing stay
//! pullable until drained, after which pulls report end of stream. Pushing
//! into a closed channel is a programming error and panics.
//!
//! ## Example
//!
//! ```rust
//! use pipeweave::Chan;
//!
//! # tokio_test::block_on(async {
//! let chan = Chan::new(2);
//! let (push, pull) = chan.split();
//!
//! push.push(1).await;
//! push.push(2).await;
//! push.close();
//!
//! assert_eq!(pull.pull_safe().await, Some(1));
//! assert_eq!(pull.pull_safe().await, Some(2));
//! assert_eq!(pull.pull_safe().await, None);
//! # });
//! ```

use crate::error::{TryPullError, TryPushError};
use futures::Stream;
use std::collections::VecDeque;
use std::fmt;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::trace;

struct State<T> {
  queue: VecDeque<T>,
  closed: bool,
  /// Values ever enqueued. A rendezvous push waits until `pulled` reaches its
  /// own position in this sequence.
  pushed: u64,
  /// Values ever dequeued.
  pulled: u64,
  /// Consumers currently suspended in a pull.
  parked: usize,
}

struct Shared<T> {
  state: Mutex<State<T>>,
  capacity: usize,
  /// Signalled when a value is enqueued or the channel closes.
  readable: Notify,
  /// Signalled when a value is dequeued or the channel closes.
  writable: Notify,
}

impl<T> Shared<T> {
  fn new(capacity: usize) -> Self {
    Self {
      state: Mutex::new(State {
        queue: VecDeque::with_capacity(capacity),
        closed: false,
        pushed: 0,
        pulled: 0,
        parked: 0,
      }),
      capacity,
      readable: Notify::new(),
      writable: Notify::new(),
    }
  }

  // No user code runs under the lock, so a poisoned lock still holds
  // consistent state.
  fn lock(&self) -> MutexGuard<'_, State<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Slots the queue may hold. A rendezvous channel parks one value in the
  /// queue while its pusher waits for the hand-off.
  fn slots(&self) -> usize {
    self.capacity.max(1)
  }

  fn enqueue(&self, t: T) -> Result<u64, T> {
    let mut state = self.lock();
    if state.closed {
      drop(state);
      panic!("push on a closed channel");
    }
    if state.queue.len() >= self.slots() {
      return Err(t);
    }
    state.queue.push_back(t);
    state.pushed += 1;
    let ticket = state.pushed;
    drop(state);
    self.readable.notify_waiters();
    Ok(ticket)
  }

  fn dequeue(&self) -> Result<T, TryPullError> {
    let mut state = self.lock();
    match state.queue.pop_front() {
      Some(t) => {
        state.pulled += 1;
        drop(state);
        self.writable.notify_waiters();
        Ok(t)
      }
      None if state.closed => Err(TryPullError::Closed),
      None => Err(TryPullError::Empty),
    }
  }

  async fn push(&self, mut t: T) {
    loop {
      // Register interest before inspecting state so a wake-up between the
      // check and the await is not lost.
      let mut notified = pin!(self.writable.notified());
      notified.as_mut().enable();
      match self.enqueue(t) {
        Ok(ticket) => {
          if self.capacity == 0 {
            self.hand_off(ticket).await;
          }
          return;
        }
        Err(back) => t = back,
      }
      notified.await;
    }
  }

  async fn hand_off(&self, ticket: u64) {
    loop {
      let mut notified = pin!(self.writable.notified());
      notified.as_mut().enable();
      {
        let state = self.lock();
        if state.pulled >= ticket || state.closed {
          return;
        }
      }
      notified.await;
    }
  }

  fn try_push(&self, t: T) -> Result<(), TryPushError<T>> {
    let mut state = self.lock();
    if state.closed {
      drop(state);
      panic!("push on a closed channel");
    }
    let has_room = if self.capacity == 0 {
      state.queue.is_empty() && state.parked > 0
    } else {
      state.queue.len() < self.capacity
    };
    if !has_room {
      return Err(TryPushError::Full(t));
    }
    state.queue.push_back(t);
    state.pushed += 1;
    drop(state);
    self.readable.notify_waiters();
    Ok(())
  }

  async fn pull(&self) -> Option<T> {
    loop {
      let mut notified = pin!(self.readable.notified());
      notified.as_mut().enable();
      match self.dequeue() {
        Ok(t) => return Some(t),
        Err(TryPullError::Closed) => return None,
        Err(TryPullError::Empty) => {}
      }
      let _parked = Parked::new(self);
      notified.await;
    }
  }

  fn close(&self) {
    let mut state = self.lock();
    if state.closed {
      return;
    }
    state.closed = true;
    let pending = state.queue.len();
    drop(state);
    trace!(pending, "channel closed");
    self.readable.notify_waiters();
    self.writable.notify_waiters();
  }
}

/// Marks a consumer as suspended for the duration of one wait, so that a
/// rendezvous `try_push` can tell whether anyone is ready to take a value.
struct Parked<'a, T> {
  shared: &'a Shared<T>,
}

impl<'a, T> Parked<'a, T> {
  fn new(shared: &'a Shared<T>) -> Self {
    shared.lock().parked += 1;
    Self { shared }
  }
}

impl<T> Drop for Parked<'_, T> {
  fn drop(&mut self) {
    self.shared.lock().parked -= 1;
  }
}

/// Bidirectional handle to a channel.
///
/// Created with [`Chan::new`]; split into a [`ChanPush`] for the producer and a
/// [`ChanPull`] for the consumer with [`Chan::split`].
pub struct Chan<T> {
  shared: Arc<Shared<T>>,
}

impl<T> Chan<T> {
  /// Creates an open channel buffering up to `capacity` values.
  ///
  /// A capacity of `0` creates a rendezvous channel.
  pub fn new(capacity: usize) -> Self {
    Self {
      shared: Arc::new(Shared::new(capacity)),
    }
  }

  /// Returns a producer handle to this channel.
  pub fn push_end(&self) -> ChanPush<T> {
    ChanPush {
      shared: Arc::clone(&self.shared),
    }
  }

  /// Returns a consumer handle to this channel.
  pub fn pull_end(&self) -> ChanPull<T> {
    ChanPull {
      shared: Arc::clone(&self.shared),
    }
  }

  /// Consumes the handle and returns both ends.
  pub fn split(self) -> (ChanPush<T>, ChanPull<T>) {
    let push = self.push_end();
    (push, ChanPull { shared: self.shared })
  }

  /// See [`ChanPush::push`].
  pub async fn push(&self, t: T) {
    self.shared.push(t).await;
  }

  /// See [`ChanPush::try_push`].
  pub fn try_push(&self, t: T) -> Result<(), TryPushError<T>> {
    self.shared.try_push(t)
  }

  /// See [`ChanPull::pull`].
  pub async fn pull(&self) -> T
  where
    T: Default,
  {
    self.shared.pull().await.unwrap_or_default()
  }

  /// See [`ChanPull::pull_safe`].
  pub async fn pull_safe(&self) -> Option<T> {
    self.shared.pull().await
  }

  /// See [`ChanPull::try_pull`].
  pub fn try_pull(&self) -> Result<T, TryPullError> {
    self.shared.dequeue()
  }

  /// See [`ChanPull::drain`].
  pub async fn drain(&self) {
    while self.shared.pull().await.is_some() {}
  }

  /// See [`ChanPush::close`].
  pub fn close(&self) {
    self.shared.close();
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.shared.lock().queue.len()
  }

  /// Whether no value is currently buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The capacity the channel was created with.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Whether the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.shared.lock().closed
  }
}

/// Producer end of a channel.
///
/// The producer is responsible for eventually closing the channel exactly once;
/// further calls to [`close`](ChanPush::close) are harmless.
pub struct ChanPush<T> {
  shared: Arc<Shared<T>>,
}

impl<T> ChanPush<T> {
  /// Pushes a value, waiting while the channel is full.
  ///
  /// On a rendezvous channel this waits until a consumer has taken the value.
  ///
  /// # Panics
  ///
  /// Panics if the channel is closed.
  pub async fn push(&self, t: T) {
    self.shared.push(t).await;
  }

  /// Pushes a value if that is possible without waiting.
  ///
  /// On a rendezvous channel this only succeeds when a consumer is already
  /// suspended in a pull.
  ///
  /// # Panics
  ///
  /// Panics if the channel is closed.
  pub fn try_push(&self, t: T) -> Result<(), TryPushError<T>> {
    self.shared.try_push(t)
  }

  /// Closes the channel. Closing an already closed channel does nothing.
  pub fn close(&self) {
    self.shared.close();
  }

  /// Whether the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.shared.lock().closed
  }

  /// The capacity the channel was created with.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }
}

/// Consumer end of a channel.
///
/// All pulls are cancel-safe: dropping a pending pull never loses a value,
/// which makes them suitable as `tokio::select!` branches.
pub struct ChanPull<T> {
  shared: Arc<Shared<T>>,
}

impl<T> ChanPull<T> {
  /// Returns a pull end that is already closed and empty.
  pub fn closed() -> Self {
    let chan = Chan::new(0);
    chan.close();
    chan.pull_end()
  }

  /// Pulls the next value, waiting while the channel is empty and open.
  ///
  /// Returns `T::default()` once the channel is closed and drained; use
  /// [`pull_safe`](Self::pull_safe) when the default is a legitimate value.
  pub async fn pull(&self) -> T
  where
    T: Default,
  {
    self.shared.pull().await.unwrap_or_default()
  }

  /// Pulls the next value, or `None` once the channel is closed and drained.
  pub async fn pull_safe(&self) -> Option<T> {
    self.shared.pull().await
  }

  /// Pulls a value if one is buffered right now.
  pub fn try_pull(&self) -> Result<T, TryPullError> {
    self.shared.dequeue()
  }

  /// Discards values until the channel is closed and drained.
  pub async fn drain(&self) {
    while self.shared.pull().await.is_some() {}
  }

  /// Discards a single value, or returns once the channel is closed and
  /// drained.
  pub async fn wait(&self) {
    let _ = self.shared.pull().await;
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.shared.lock().queue.len()
  }

  /// Whether no value is currently buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Whether the channel has been closed. Buffered values may remain.
  pub fn is_closed(&self) -> bool {
    self.shared.lock().closed
  }

  /// Adapts this end into a [`Stream`] that ends when the channel is closed
  /// and drained.
  pub fn into_stream(self) -> impl Stream<Item = T> + Send + 'static
  where
    T: Send + 'static,
  {
    async_stream::stream! {
      while let Some(t) = self.pull_safe().await {
        yield t;
      }
    }
  }
}

impl<T> Clone for Chan<T> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> Clone for ChanPush<T> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> Clone for ChanPull<T> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> From<Chan<T>> for ChanPull<T> {
  fn from(chan: Chan<T>) -> Self {
    Self {
      shared: chan.shared,
    }
  }
}

impl<T> From<Chan<T>> for ChanPush<T> {
  fn from(chan: Chan<T>) -> Self {
    Self {
      shared: chan.shared,
    }
  }
}

fn fmt_shared<T>(name: &str, shared: &Shared<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
  let state = shared.lock();
  f.debug_struct(name)
    .field("capacity", &shared.capacity)
    .field("len", &state.queue.len())
    .field("closed", &state.closed)
    .finish()
}

impl<T> fmt::Debug for Chan<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_shared("Chan", &self.shared, f)
  }
}

impl<T> fmt::Debug for ChanPush<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_shared("ChanPush", &self.shared, f)
  }
}

impl<T> fmt::Debug for ChanPull<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt_shared("ChanPull", &self.shared, f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::StreamExt;
  use tokio_test::{assert_pending, assert_ready, task};

  #[tokio::test]
  async fn test_buffered_fifo() {
    let chan = Chan::new(3);
    chan.push(1).await;
    chan.push(2).await;
    chan.push(3).await;
    assert_eq!(chan.len(), 3);

    let pull = chan.pull_end();
    assert_eq!(pull.pull_safe().await, Some(1));
    assert_eq!(pull.pull_safe().await, Some(2));
    assert_eq!(pull.pull_safe().await, Some(3));
    assert!(pull.is_empty());
  }

  #[tokio::test]
  async fn test_values_survive_close() {
    let (push, pull) = Chan::new(4).split();
    push.push("a").await;
    push.push("b").await;
    push.close();

    assert!(pull.is_closed());
    assert_eq!(pull.pull_safe().await, Some("a"));
    assert_eq!(pull.pull_safe().await, Some("b"));
    assert_eq!(pull.pull_safe().await, None);
    assert_eq!(pull.pull_safe().await, None);
  }

  #[tokio::test]
  async fn test_close_is_idempotent() {
    let chan = Chan::<i32>::new(1);
    chan.close();
    chan.close();
    chan.push_end().close();
    assert!(chan.is_closed());
    assert_eq!(chan.try_pull(), Err(TryPullError::Closed));
  }

  #[tokio::test]
  async fn test_pull_returns_default_when_closed() {
    let (push, pull) = Chan::<u32>::new(1).split();
    push.push(9).await;
    push.close();
    assert_eq!(pull.pull().await, 9);
    assert_eq!(pull.pull().await, 0);
  }

  #[tokio::test]
  #[should_panic(expected = "push on a closed channel")]
  async fn test_push_to_closed_panics() {
    let chan = Chan::new(1);
    chan.close();
    chan.push(1).await;
  }

  #[test]
  #[should_panic(expected = "push on a closed channel")]
  fn test_try_push_to_closed_panics() {
    let chan = Chan::new(1);
    chan.close();
    let _ = chan.try_push(1);
  }

  #[test]
  fn test_try_push_and_try_pull() {
    let chan = Chan::new(1);
    assert_eq!(chan.try_pull(), Err(TryPullError::Empty));
    assert_eq!(chan.try_push(1), Ok(()));
    assert_eq!(chan.try_push(2), Err(TryPushError::Full(2)));
    assert_eq!(chan.try_pull(), Ok(1));
    assert_eq!(chan.try_pull(), Err(TryPullError::Empty));
  }

  #[test]
  fn test_push_waits_while_full() {
    let chan = Chan::new(1);
    assert_eq!(chan.try_push(1), Ok(()));

    let mut push = task::spawn(chan.push(2));
    assert_pending!(push.poll());

    assert_eq!(chan.try_pull(), Ok(1));
    assert!(push.is_woken());
    assert_ready!(push.poll());
    assert_eq!(chan.try_pull(), Ok(2));
  }

  #[test]
  fn test_rendezvous_push_waits_for_consumer() {
    let chan = Chan::new(0);
    let mut push = task::spawn(chan.push(5));
    assert_pending!(push.poll());

    assert_eq!(chan.try_pull(), Ok(5));
    assert!(push.is_woken());
    assert_ready!(push.poll());
  }

  #[test]
  fn test_rendezvous_try_push_needs_parked_consumer() {
    let chan = Chan::new(0);
    assert_eq!(chan.try_push(1), Err(TryPushError::Full(1)));

    let mut pull = task::spawn(chan.pull_safe());
    assert_pending!(pull.poll());

    assert_eq!(chan.try_push(2), Ok(()));
    assert!(pull.is_woken());
    assert_eq!(assert_ready!(pull.poll()), Some(2));
  }

  #[test]
  fn test_dropped_pull_loses_nothing() {
    let chan = Chan::new(1);
    {
      let mut pull = task::spawn(chan.pull_safe());
      assert_pending!(pull.poll());
    }
    assert_eq!(chan.try_push(3), Ok(()));
    assert_eq!(chan.try_pull(), Ok(3));
  }

  #[tokio::test]
  async fn test_close_wakes_waiting_consumers() {
    let (push, pull) = Chan::<i32>::new(0).split();
    let waiter = tokio::spawn(async move { pull.pull_safe().await });
    tokio::task::yield_now().await;
    push.close();
    assert_eq!(waiter.await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_drain_and_wait() {
    let (push, pull) = Chan::new(8).split();
    for i in 0..5 {
      push.push(i).await;
    }
    push.close();

    pull.wait().await;
    assert_eq!(pull.len(), 4);
    pull.drain().await;
    assert_eq!(pull.try_pull(), Err(TryPullError::Closed));
  }

  #[tokio::test]
  async fn test_many_producers_many_consumers() {
    let (push, pull) = Chan::new(2).split();
    let producers: Vec<_> = (0..4)
      .map(|p| {
        let push = push.clone();
        tokio::spawn(async move {
          for i in 0..25 {
            push.push(p * 100 + i).await;
          }
        })
      })
      .collect();
    let consumers: Vec<_> = (0..3)
      .map(|_| {
        let pull = pull.clone();
        tokio::spawn(async move {
          let mut seen = Vec::new();
          while let Some(v) = pull.pull_safe().await {
            seen.push(v);
          }
          seen
        })
      })
      .collect();

    for producer in producers {
      producer.await.unwrap();
    }
    push.close();

    let mut all = Vec::new();
    for consumer in consumers {
      all.extend(consumer.await.unwrap());
    }
    all.sort_unstable();
    let mut expected: Vec<_> = (0..4).flat_map(|p| (0..25).map(move |i| p * 100 + i)).collect();
    expected.sort_unstable();
    assert_eq!(all, expected);
  }

  #[tokio::test]
  async fn test_into_stream() {
    let (push, pull) = Chan::new(3).split();
    push.push(1).await;
    push.push(2).await;
    push.close();
    let items: Vec<i32> = pull.into_stream().collect().await;
    assert_eq!(items, vec![1, 2]);
  }

  #[test]
  fn test_closed_pull_end() {
    let pull = ChanPull::<i32>::closed();
    assert!(pull.is_closed());
    assert_eq!(pull.try_pull(), Err(TryPullError::Closed));
  }

  #[test]
  fn test_debug_format() {
    let chan = Chan::<i32>::new(2);
    assert_eq!(
      format!("{:?}", chan.pull_end()),
      "ChanPull { capacity: 2, len: 0, closed: false }"
    );
  }
}
