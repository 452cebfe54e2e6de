use crate::{Chan, ChanPull, StageConfig, distribute, fan_in, fan_out, round_robin, router, router_with_sink};
use futures::StreamExt;
use futures::future::join_all;
use std::time::Duration;

fn feed<T: Send + 'static>(items: Vec<T>, size: usize) -> ChanPull<T> {
  let (push, pull) = Chan::new(size).split();
  tokio::spawn(async move {
    for item in items {
      push.push(item).await;
    }
    push.close();
  });
  pull
}

async fn collect<T: Send + 'static>(pull: ChanPull<T>) -> Vec<T> {
  pull.into_stream().collect().await
}

async fn collect_all<T: Send + 'static>(pulls: Vec<ChanPull<T>>) -> Vec<Vec<T>> {
  join_all(pulls.into_iter().map(collect)).await
}

#[tokio::test]
async fn test_fan_in_merges_every_input() {
  let inputs = vec![feed(vec![1, 2, 3], 1), feed(vec![10, 20], 0), feed(vec![100], 2)];
  let mut got = collect(fan_in(&StageConfig::new(1, 2), inputs)).await;
  got.sort_unstable();
  assert_eq!(got, vec![1, 2, 3, 10, 20, 100]);
}

#[tokio::test]
async fn test_fan_in_keeps_per_input_order() {
  let inputs = vec![feed((0..50).collect(), 4), feed((100..150).collect(), 4)];
  let got = collect(fan_in(&StageConfig::new(1, 4), inputs)).await;

  let low: Vec<_> = got.iter().copied().filter(|x| *x < 100).collect();
  let high: Vec<_> = got.iter().copied().filter(|x| *x >= 100).collect();
  assert_eq!(low, (0..50).collect::<Vec<_>>());
  assert_eq!(high, (100..150).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_fan_in_waits_for_the_last_input() {
  let (early, early_pull) = Chan::new(1).split();
  let (late, late_pull) = Chan::new(1).split();
  let merged = fan_in(&StageConfig::new(1, 1), vec![early_pull, late_pull]);

  early.push(1).await;
  early.close();
  assert_eq!(merged.pull_safe().await, Some(1));
  assert!(!merged.is_closed());

  late.push(2).await;
  late.close();
  assert_eq!(merged.pull_safe().await, Some(2));
  assert_eq!(merged.pull_safe().await, None);
}

#[tokio::test]
async fn test_fan_in_without_inputs_is_closed() {
  let merged = fan_in::<u8>(&StageConfig::default(), Vec::new());
  assert!(merged.is_closed());
  assert_eq!(merged.pull_safe().await, None);
}

#[tokio::test]
async fn test_fan_out_copies_in_order() {
  let outs = fan_out(&StageConfig::new(1, 2), 3, feed((0..20).collect::<Vec<u16>>(), 2));
  assert_eq!(outs.len(), 3);

  for got in collect_all(outs).await {
    assert_eq!(got, (0..20).collect::<Vec<_>>());
  }
}

#[tokio::test]
async fn test_fan_out_closes_every_output() {
  let (push, input) = Chan::<u8>::new(0).split();
  let outs = fan_out(&StageConfig::new(1, 1), 2, input);
  push.close();

  for out in &outs {
    assert_eq!(out.pull_safe().await, None);
  }
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_slow_output_stalls_siblings() {
  let outs = fan_out(&StageConfig::new(1, 1), 2, feed((0..10).collect::<Vec<u8>>(), 4));
  let (fast, slow) = (&outs[0], &outs[1]);

  // One item fills the idle output's buffer, the next blocks on it.
  assert_eq!(fast.pull_safe().await, Some(0));
  assert_eq!(fast.pull_safe().await, Some(1));
  assert!(
    tokio::time::timeout(Duration::from_millis(100), fast.pull_safe())
      .await
      .is_err()
  );

  assert_eq!(slow.pull_safe().await, Some(0));
  assert_eq!(fast.pull_safe().await, Some(2));
}

#[tokio::test]
async fn test_distribute_follows_selector() {
  let outs = distribute(
    &StageConfig::new(1, 8),
    3,
    |x: &u32| (x % 3) as usize,
    feed((0..30).collect(), 4),
  );

  let got = collect_all(outs).await;
  for (index, items) in got.iter().enumerate() {
    assert_eq!(items.len(), 10);
    assert!(items.iter().all(|x| *x as usize % 3 == index));
  }
}

#[tokio::test]
async fn test_distribute_with_no_outputs_leaves_input_alone() {
  let (push, input) = Chan::new(1).split();
  let outs = distribute(&StageConfig::default(), 0, |_: &u8| 0, input.clone());
  assert!(outs.is_empty());

  push.push(9).await;
  assert_eq!(input.try_pull(), Ok(9));
}

#[tokio::test]
async fn test_distribute_out_of_range_closes_outputs() {
  let outs = distribute(&StageConfig::new(1, 4), 2, |x: &usize| *x, feed(vec![0, 1, 5, 1], 4));

  let got = tokio::time::timeout(Duration::from_secs(5), collect_all(outs))
    .await
    .expect("outputs were never closed");
  assert_eq!(got, vec![vec![0], vec![1]]);
}

#[tokio::test]
async fn test_round_robin_deals_evenly() {
  let outs = round_robin(&StageConfig::new(1, 4), 4, feed((0..40).collect::<Vec<u32>>(), 4));

  let got = collect_all(outs).await;
  for (index, items) in got.iter().enumerate() {
    assert_eq!(items.len(), 10);
    assert_eq!(items[0], index as u32);
    assert!(items.windows(2).all(|w| w[1] == w[0] + 4));
  }
}

#[tokio::test]
async fn test_router_matches_keys() {
  let words = vec!["apple", "avocado", "banana", "blueberry", "cherry", "apricot", "date"];
  let (routes, rest) = router(
    &StageConfig::new(1, 8),
    vec!['a', 'b', 'c'],
    |w: &&str| w.chars().next().unwrap_or_default(),
    feed(words, 2),
  );

  let (routes, rest) = tokio::join!(collect_all(routes), collect(rest));
  assert_eq!(routes[0], vec!["apple", "avocado", "apricot"]);
  assert_eq!(routes[1], vec!["banana", "blueberry"]);
  assert_eq!(routes[2], vec!["cherry"]);
  assert_eq!(rest, vec!["date"]);
}

#[tokio::test]
async fn test_router_duplicate_key_goes_to_last_listing() {
  let (routes, rest) = router(&StageConfig::new(1, 4), vec![1, 2, 1], |x: &u8| x % 3, feed(vec![1, 4, 2, 3], 4));

  let (routes, rest) = tokio::join!(collect_all(routes), collect(rest));
  assert_eq!(routes, vec![vec![], vec![2], vec![1, 4]]);
  assert_eq!(rest, vec![3]);
}

#[tokio::test]
async fn test_router_with_sink_hands_off_unmatched() {
  let (unmatched, leftovers) = Chan::new(8).split();
  let routes = router_with_sink(
    &StageConfig::new(1, 8),
    vec![true],
    |x: &i32| *x > 0,
    move |x| unmatched.try_push(x).unwrap(),
    feed(vec![3, -1, 4, -5], 4),
  );

  let got = collect_all(routes).await;
  assert_eq!(got, vec![vec![3, 4]]);
  assert_eq!(leftovers.try_pull(), Ok(-1));
  assert_eq!(leftovers.try_pull(), Ok(-5));
}

#[tokio::test]
async fn test_cancelled_router_closes_every_output() {
  let config = StageConfig::new(1, 1);
  let (_push, input) = Chan::<u8>::new(1).split();
  let (routes, rest) = router(&config, vec![0, 1], |x: &u8| *x, input);

  config.cancellation().cancel();
  for route in &routes {
    assert_eq!(route.pull_safe().await, None);
  }
  assert_eq!(rest.pull_safe().await, None);
}
