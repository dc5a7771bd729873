// src/mux/mod.rs

//! A fan-in multiplexer: many independently-owned asynchronous sources,
//! one logical stream of values, exactly one consumer.
//!
//! The [`Multiplexer`] races one outstanding take per source. Whichever
//! take finishes first supplies the next value; ties are broken by slot
//! index, lowest first. A take that fails is swallowed and its source is
//! quietly re-launched on the next pass, so one misbehaving source never
//! poisons the stream. A take that completes while nobody is waiting is
//! cached in its slot and served to the next dequeue, so no value is ever
//! lost, even when the consumer cancels or abandons a wait mid-flight.
//!
//! # Examples
//!
//! ```
//! use manifold::{sources, CancellationToken, Multiplexer, SourceHandle};
//! use std::sync::Arc;
//!
//! let handles: Vec<SourceHandle<u32>> = vec![
//!   Arc::new(sources::iter([1, 2])),
//!   Arc::new(sources::iter([10])),
//! ];
//! let mut mux = Multiplexer::new(handles).unwrap();
//!
//! tokio::runtime::Runtime::new().unwrap().block_on(async {
//!   let cancel = CancellationToken::new();
//!   // Both sources are ready immediately; the lower slot index wins.
//!   assert_eq!(mux.dequeue(&cancel).await.unwrap(), 1);
//!   assert_eq!(mux.dequeue(&cancel).await.unwrap(), 10);
//!   assert_eq!(mux.dequeue(&cancel).await.unwrap(), 2);
//! });
//! ```

use crate::error::{DequeueError, EmptySources, TakeError, TryDequeueError};
use crate::source::{SourceHandle, TakeFuture};
use crate::telemetry;
use futures_core::Stream;
use futures_util::task::noop_waker_ref;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

const LOC_LAUNCH: &str = "Multiplexer::launch_idle";
const LOC_WAIT: &str = "Multiplexer::poll_in_flight";
const LOC_SCAN: &str = "Multiplexer::take_first";
const LOC_DEQUEUE: &str = "DequeueFuture::poll";

const EVT_TAKE_LAUNCHED: &str = "TakeLaunched";
const EVT_TAKE_OK: &str = "TakeCompletedOk";
const EVT_TAKE_FAILED: &str = "TakeCompletedFailed";
const EVT_TAKE_CANCELLED: &str = "TakeCompletedCancelled";

const CTR_LAUNCHES: &str = "TakesLaunched";
const CTR_CLAIMS: &str = "ValuesClaimed";
const CTR_RETIRED_FAILED: &str = "FailedTakesRetired";
const CTR_RETIRED_CANCELLED: &str = "CancelledTakesRetired";
const CTR_DEQUEUES_CANCELLED: &str = "DequeuesCancelled";
const CTR_INCONSISTENT_WAITS: &str = "InconsistentWaits";

// --- Slot State ---

/// One slot per source. The slot is the only place a take for that source
/// ever lives, which is what bounds the race to one outstanding take per
/// source and guarantees a completed-but-unclaimed value has somewhere to
/// wait.
enum Slot<T> {
  /// No outstanding take; the source is launched on the next pass.
  Idle,
  /// A take is running. It stays here across dequeue calls, however many,
  /// until it resolves.
  InFlight(TakeFuture<T>),
  /// A take finished and nobody has claimed the outcome yet.
  Done(Result<T, TakeError>),
}

impl<T> Slot<T> {
  fn is_done(&self) -> bool {
    matches!(self, Slot::Done(_))
  }

  /// Takes the terminal outcome out of a finished slot, leaving it idle.
  fn retire(&mut self) -> Option<Result<T, TakeError>> {
    if self.is_done() {
      if let Slot::Done(outcome) = mem::replace(self, Slot::Idle) {
        return Some(outcome);
      }
    }
    None
  }
}

// --- Multiplexer ---

/// Fans N asynchronous sources into one dequeue-at-a-time stream of values.
///
/// All dequeue entry points take `&mut self`: the single-consumer contract
/// is enforced by the borrow checker rather than by a runtime lock. Wrap
/// the multiplexer in your own mutex if several tasks must share it.
pub struct Multiplexer<T: Send> {
  sources: Box<[SourceHandle<T>]>,
  slots: Box<[Slot<T>]>,
  // Signal handed to takes launched from paths that have no caller signal
  // (`try_dequeue`, `Stream`). Never fires.
  no_cancel: CancellationToken,
}

impl<T: Send> Multiplexer<T> {
  /// Creates a multiplexer over `sources`.
  ///
  /// Slot `i` belongs to `sources[i]`, and index order is the tie-break
  /// order whenever several takes are ready at once. An empty list is
  /// rejected: it could never produce a value.
  pub fn new(sources: Vec<SourceHandle<T>>) -> Result<Self, EmptySources> {
    if sources.is_empty() {
      return Err(EmptySources);
    }
    let slots = sources.iter().map(|_| Slot::Idle).collect();
    Ok(Multiplexer {
      sources: sources.into_boxed_slice(),
      slots,
      no_cancel: CancellationToken::new(),
    })
  }

  /// Dequeues the next value, racing every source.
  ///
  /// A cached or freshly completed success at the lowest slot index wins.
  /// Failed takes encountered by the scan are retired so their sources
  /// re-enter the race; if every completion in a pass was a failure the
  /// pass repeats without suspending. The returned future only suspends
  /// while no take has reached a terminal state.
  ///
  /// `cancel` aborts the wait, not the sources: in-flight takes keep their
  /// slots, and a value one of them later produces is served by a later
  /// call. When the signal has fired, a cached success is still preferred
  /// over reporting [`DequeueError::Cancelled`].
  pub fn dequeue(&mut self, cancel: &CancellationToken) -> DequeueFuture<'_, T> {
    DequeueFuture {
      fired: Box::pin(cancel.clone().cancelled_owned()),
      cancel: cancel.clone(),
      mux: self,
    }
  }

  /// Attempts to dequeue without waiting.
  ///
  /// Serves a cached success if one exists; otherwise launches idle
  /// sources and gives every in-flight take a single poll. Whatever does
  /// not complete on the spot simply stays in flight for later calls.
  pub fn try_dequeue(&mut self) -> Result<T, TryDequeueError> {
    if let Some(value) = self.take_first() {
      return Ok(value);
    }
    let cancel = self.no_cancel.clone();
    self.launch_idle(&cancel);
    // One pass with a no-op waker. `&mut self` means no dequeue can be
    // suspended on these takes right now, so no real waker is displaced
    // for good: the next dequeue or poll re-registers its own.
    let mut cx = Context::from_waker(noop_waker_ref());
    if self.poll_in_flight(&mut cx) > 0 {
      if let Some(value) = self.take_first() {
        return Ok(value);
      }
    }
    Err(TryDequeueError::Empty)
  }

  /// Returns the number of sources being raced.
  pub fn source_count(&self) -> usize {
    self.sources.len()
  }

  /// Returns the number of takes currently running.
  pub fn in_flight(&self) -> usize {
    self
      .slots
      .iter()
      .filter(|slot| matches!(slot, Slot::InFlight(_)))
      .count()
  }

  /// Returns the number of completed successes waiting to be claimed.
  pub fn cached(&self) -> usize {
    self
      .slots
      .iter()
      .filter(|slot| matches!(slot, Slot::Done(Ok(_))))
      .count()
  }

  // --- Internal Machinery ---

  /// First-index scan over finished takes. Claims the first success and
  /// leaves its slot idle; failures passed over on the way are retired so
  /// their sources relaunch.
  fn take_first(&mut self) -> Option<T> {
    for (index, slot) in self.slots.iter_mut().enumerate() {
      match slot.retire() {
        Some(Ok(value)) => {
          telemetry::log_event(Some(index), LOC_SCAN, EVT_TAKE_OK, None);
          telemetry::increment_counter(LOC_SCAN, CTR_CLAIMS);
          return Some(value);
        }
        Some(Err(TakeError::Failed)) => {
          telemetry::log_event(Some(index), LOC_SCAN, EVT_TAKE_FAILED, None);
          telemetry::increment_counter(LOC_SCAN, CTR_RETIRED_FAILED);
        }
        Some(Err(TakeError::Cancelled)) => {
          telemetry::log_event(Some(index), LOC_SCAN, EVT_TAKE_CANCELLED, None);
          telemetry::increment_counter(LOC_SCAN, CTR_RETIRED_CANCELLED);
        }
        None => {}
      }
    }
    None
  }

  /// Starts a take for every idle slot, in index order.
  fn launch_idle(&mut self, cancel: &CancellationToken) {
    for (index, (source, slot)) in self.sources.iter().zip(self.slots.iter_mut()).enumerate() {
      if matches!(slot, Slot::Idle) {
        telemetry::log_event(Some(index), LOC_LAUNCH, EVT_TAKE_LAUNCHED, None);
        telemetry::increment_counter(LOC_LAUNCH, CTR_LAUNCHES);
        *slot = Slot::InFlight(source.take_next(cancel.clone()));
      }
    }
  }

  /// Polls every in-flight take once with the caller's waker, so any
  /// source can wake the race. Terminal outcomes are recorded in place;
  /// returns how many takes completed during this pass.
  fn poll_in_flight(&mut self, cx: &mut Context<'_>) -> usize {
    let mut completed = 0;
    for slot in self.slots.iter_mut() {
      if let Slot::InFlight(take) = slot {
        if let Poll::Ready(outcome) = take.as_mut().poll(cx) {
          *slot = Slot::Done(outcome);
          completed += 1;
        }
      }
    }
    completed
  }

  /// The dequeue pass: fast-path scan, then launch, wait, re-scan, until a
  /// value is claimed or nothing terminal is left to report.
  fn poll_dequeue(&mut self, cx: &mut Context<'_>, cancel: &CancellationToken) -> Poll<Result<T, DequeueError>> {
    if let Some(value) = self.take_first() {
      return Poll::Ready(Ok(value));
    }
    loop {
      // A signal that fired mid-poll must not relaunch takes that would
      // cancel instantly; park instead and let the owner's watcher (which
      // registered with `cx` before this call) resolve the dequeue.
      if cancel.is_cancelled() {
        return Poll::Pending;
      }
      self.launch_idle(cancel);
      if self.poll_in_flight(cx) == 0 {
        return Poll::Pending;
      }
      // The wait reported completions, so the scan must find at least one
      // terminal slot. Anything else means the bookkeeping is broken, and
      // that is reported loudly rather than papered over.
      if !self.slots.iter().any(Slot::is_done) {
        telemetry::increment_counter(LOC_WAIT, CTR_INCONSISTENT_WAITS);
        return Poll::Ready(Err(DequeueError::Inconsistent));
      }
      if let Some(value) = self.take_first() {
        return Poll::Ready(Ok(value));
      }
      // Every completion this pass was a failure. Their slots are idle
      // again, so the next iteration relaunches them.
    }
  }
}

impl<T: Send> fmt::Debug for Multiplexer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Multiplexer")
      .field("sources", &self.source_count())
      .field("in_flight", &self.in_flight())
      .field("cached", &self.cached())
      .finish()
  }
}

// A multiplexer used as a `Stream` has no caller signal, never reports
// cancellation and never ends on its own; `poll_next` suspends while no
// source has anything to give. A broken invariant terminates the stream.
impl<T: Send> Stream for Multiplexer<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    let cancel = this.no_cancel.clone();
    match this.poll_dequeue(cx, &cancel) {
      Poll::Ready(Ok(value)) => Poll::Ready(Some(value)),
      Poll::Ready(Err(_)) => Poll::Ready(None),
      Poll::Pending => Poll::Pending,
    }
  }
}

// --- Future Implementations ---

#[must_use = "futures do nothing unless you .await or poll them"]
pub struct DequeueFuture<'a, T: Send> {
  mux: &'a mut Multiplexer<T>,
  cancel: CancellationToken,
  // Owned watcher for the caller's signal, boxed to keep this future Unpin.
  fired: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<'a, T: Send> Future for DequeueFuture<'a, T> {
  type Output = Result<T, DequeueError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut(); // DequeueFuture is Unpin

    // The watcher is polled first so a fired signal cannot start new work;
    // a cached success still beats reporting the cancellation.
    if this.fired.as_mut().poll(cx).is_ready() {
      return match this.mux.take_first() {
        Some(value) => Poll::Ready(Ok(value)),
        None => {
          telemetry::increment_counter(LOC_DEQUEUE, CTR_DEQUEUES_CANCELLED);
          Poll::Ready(Err(DequeueError::Cancelled))
        }
      };
    }
    this.mux.poll_dequeue(cx, &this.cancel)
  }
}

impl<'a, T: Send> fmt::Debug for DequeueFuture<'a, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DequeueFuture").field("mux", &self.mux).finish()
  }
}

#[cfg(test)]
mod tests;
