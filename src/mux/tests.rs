// src/mux/tests.rs

use super::*;
use crate::error::{DequeueError, EmptySources, TakeError, TryDequeueError};
use crate::source::SourceHandle;
use crate::sources;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const TEST_TIMEOUT: Duration = Duration::from_secs(1);

/// A source that replays a scripted sequence of outcomes, one per take,
/// then parks forever.
fn scripted<T: Send + 'static>(outcomes: Vec<Result<T, TakeError>>) -> SourceHandle<T> {
  let script = Arc::new(Mutex::new(VecDeque::from(outcomes)));
  Arc::new(sources::from_fn(move |_cancel| {
    let script = Arc::clone(&script);
    async move {
      // The guard must not live across an await.
      let next = script.lock().pop_front();
      match next {
        Some(outcome) => outcome,
        None => std::future::pending().await,
      }
    }
  }))
}

#[test]
fn rejects_empty_source_list() {
  let result = Multiplexer::<i32>::new(Vec::new());
  assert_eq!(result.err(), Some(EmptySources));
}

#[tokio::test]
async fn ready_source_resolves_immediately() {
  let mut mux = Multiplexer::new(vec![Arc::new(sources::iter([7])) as SourceHandle<i32>]).expect("non-empty");
  let cancel = CancellationToken::new();

  let value = timeout(TEST_TIMEOUT, mux.dequeue(&cancel))
    .await
    .expect("dequeue timed out")
    .expect("dequeue failed");
  assert_eq!(value, 7);
}

#[tokio::test]
async fn lowest_slot_index_wins_a_tie() {
  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1])) as SourceHandle<i32>,
    Arc::new(sources::iter([2])),
  ])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.dequeue(&cancel).await, Ok(1));
  // The loser of the tie was cached, not lost.
  assert_eq!(mux.dequeue(&cancel).await, Ok(2));
}

#[tokio::test]
async fn cached_value_served_before_new_launches() {
  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1, 2])) as SourceHandle<i32>,
    Arc::new(sources::iter([10])),
  ])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.dequeue(&cancel).await, Ok(1));
  assert_eq!(mux.cached(), 1);
  // Slot 1's unclaimed 10 is served before slot 0 is asked for its 2.
  assert_eq!(mux.dequeue(&cancel).await, Ok(10));
  assert_eq!(mux.dequeue(&cancel).await, Ok(2));
}

#[tokio::test]
async fn three_sources_drain_in_scan_order() {
  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1, 10])) as SourceHandle<i32>,
    Arc::new(sources::iter([2, 20])),
    Arc::new(sources::iter([3, 30])),
  ])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  let mut drained = Vec::new();
  for _ in 0..6 {
    drained.push(mux.dequeue(&cancel).await.expect("dequeue failed"));
  }
  // Each launch wave completes together; the scan claims one per call and
  // caches the rest, so waves drain in index order before the relaunch.
  assert_eq!(drained, vec![1, 2, 3, 10, 20, 30]);
}

#[tokio::test]
async fn counts_track_slot_states() {
  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1])) as SourceHandle<i32>,
    Arc::new(sources::pending()),
  ])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.source_count(), 2);
  assert_eq!(mux.in_flight(), 0);
  assert_eq!(mux.cached(), 0);

  assert_eq!(mux.dequeue(&cancel).await, Ok(1));
  // The quiet source keeps its take across calls.
  assert_eq!(mux.in_flight(), 1);
  assert_eq!(mux.cached(), 0);

  // try_dequeue relaunches the drained slot, which then parks too.
  assert_eq!(mux.try_dequeue(), Err(TryDequeueError::Empty));
  assert_eq!(mux.in_flight(), 2);
}

#[tokio::test]
async fn try_dequeue_claims_a_ready_value() {
  let mut mux = Multiplexer::new(vec![Arc::new(sources::iter([5])) as SourceHandle<i32>]).expect("non-empty");
  assert_eq!(mux.try_dequeue(), Ok(5));
}

#[tokio::test]
async fn try_dequeue_reports_empty_without_waiting() {
  let mut mux = Multiplexer::new(vec![Arc::new(sources::pending::<i32>()) as SourceHandle<i32>]).expect("non-empty");
  assert_eq!(mux.try_dequeue(), Err(TryDequeueError::Empty));
}

#[tokio::test]
async fn failed_takes_are_swallowed_and_retried() {
  let mut mux = Multiplexer::new(vec![scripted(vec![Err(TakeError::Failed), Ok(9)])]).expect("non-empty");
  let cancel = CancellationToken::new();

  let value = timeout(TEST_TIMEOUT, mux.dequeue(&cancel))
    .await
    .expect("dequeue timed out")
    .expect("dequeue failed");
  assert_eq!(value, 9);
}

#[tokio::test]
async fn cancelled_takes_are_swallowed_and_retried() {
  let mut mux =
    Multiplexer::new(vec![scripted(vec![Err(TakeError::Cancelled), Ok(4)])]).expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.dequeue(&cancel).await, Ok(4));
}

#[tokio::test]
async fn fired_signal_fails_the_dequeue_when_nothing_is_cached() {
  let mut mux = Multiplexer::new(vec![Arc::new(sources::pending::<i32>()) as SourceHandle<i32>]).expect("non-empty");
  let cancel = CancellationToken::new();
  cancel.cancel();

  assert_eq!(mux.dequeue(&cancel).await, Err(DequeueError::Cancelled));
}

#[tokio::test]
async fn cached_success_beats_a_fired_signal() {
  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1])) as SourceHandle<i32>,
    Arc::new(sources::iter([2])),
  ])
  .expect("non-empty");
  let live = CancellationToken::new();

  assert_eq!(mux.dequeue(&live).await, Ok(1));
  assert_eq!(mux.cached(), 1);

  let fired = CancellationToken::new();
  fired.cancel();
  // The unclaimed 2 is served even though the signal already fired.
  assert_eq!(mux.dequeue(&fired).await, Ok(2));
  // Nothing cached now, so the fired signal is reported.
  assert_eq!(mux.dequeue(&fired).await, Err(DequeueError::Cancelled));
}
