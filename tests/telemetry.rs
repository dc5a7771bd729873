// Exercises the counter and event collector behind the `manifold_telemetry`
// feature. The collector is a process-wide singleton, so these tests are
// serialized and each starts from a clean slate.

use manifold::{sources, telemetry, CancellationToken, Multiplexer, SourceHandle, TakeError};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serial_test::serial;

fn scripted(outcomes: Vec<Result<i32, TakeError>>) -> SourceHandle<i32> {
  let script = Arc::new(Mutex::new(VecDeque::from(outcomes)));
  Arc::new(sources::from_fn(move |_cancel| {
    let script = Arc::clone(&script);
    async move {
      let next = script.lock().unwrap().pop_front();
      match next {
        Some(outcome) => outcome,
        None => std::future::pending().await,
      }
    }
  }))
}

#[tokio::test]
#[serial]
async fn a_dequeue_cycle_is_counted() {
  telemetry::clear_telemetry();

  let mut mux = Multiplexer::new(vec![
    Arc::new(sources::iter([1])) as SourceHandle<i32>,
    Arc::new(sources::iter([2])),
  ])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.dequeue(&cancel).await, Ok(1));

  assert_eq!(telemetry::counter_value("Multiplexer::launch_idle", "TakesLaunched"), 2);
  assert_eq!(telemetry::counter_value("Multiplexer::take_first", "ValuesClaimed"), 1);
}

#[tokio::test]
#[serial]
async fn failures_and_cancellations_are_tallied() {
  telemetry::clear_telemetry();

  let mut mux = Multiplexer::new(vec![scripted(vec![
    Err(TakeError::Failed),
    Err(TakeError::Cancelled),
    Ok(4),
  ])])
  .expect("non-empty");
  let cancel = CancellationToken::new();

  assert_eq!(mux.dequeue(&cancel).await, Ok(4));

  assert_eq!(telemetry::counter_value("Multiplexer::launch_idle", "TakesLaunched"), 3);
  assert_eq!(telemetry::counter_value("Multiplexer::take_first", "FailedTakesRetired"), 1);
  assert_eq!(
    telemetry::counter_value("Multiplexer::take_first", "CancelledTakesRetired"),
    1
  );
  assert_eq!(telemetry::counter_value("Multiplexer::take_first", "ValuesClaimed"), 1);

  telemetry::print_telemetry_report();
}

#[tokio::test]
#[serial]
async fn a_fired_signal_starts_no_work() {
  telemetry::clear_telemetry();

  let mut mux =
    Multiplexer::new(vec![Arc::new(sources::pending::<i32>()) as SourceHandle<i32>]).expect("non-empty");
  let cancel = CancellationToken::new();
  cancel.cancel();

  assert!(mux.dequeue(&cancel).await.is_err());

  assert_eq!(telemetry::counter_value("DequeueFuture::poll", "DequeuesCancelled"), 1);
  assert_eq!(telemetry::counter_value("Multiplexer::launch_idle", "TakesLaunched"), 0);
}
