// src/error.rs

use core::fmt;

/// Error returned when constructing a multiplexer over an empty source list.
///
/// A multiplexer with nothing to race can never produce a value, so the
/// constructor rejects the configuration up front instead of letting the
/// first dequeue hang forever.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EmptySources;
impl std::error::Error for EmptySources {}
impl fmt::Display for EmptySources {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "multiplexer requires at least one source")
  }
}

/// Terminal outcome of a single take operation that did not produce a value.
///
/// Either way the multiplexer swallows the error, retires the operation and
/// re-launches the source on the next pass; the distinction exists for source
/// implementations and telemetry, not for the consumer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TakeError {
  /// The source could not produce a value this time.
  Failed,
  /// The source observed the cancellation signal and gave up.
  Cancelled,
}
impl std::error::Error for TakeError {}
impl fmt::Display for TakeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TakeError::Failed => write!(f, "source failed to produce a value"),
      TakeError::Cancelled => write!(f, "source take was cancelled"),
    }
  }
}

/// Error returned by `dequeue` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DequeueError {
  /// The caller's cancellation signal fired before a value was available.
  Cancelled,
  /// A wait completed but no operation had reached a terminal state.
  ///
  /// This cannot happen while the slot bookkeeping is correct; it is kept as
  /// a loud failure instead of an `unreachable!` so a broken invariant
  /// surfaces as an error value rather than a panic in the consumer's task.
  Inconsistent,
}
impl std::error::Error for DequeueError {}
impl fmt::Display for DequeueError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DequeueError::Cancelled => write!(f, "dequeue cancelled before a value was produced"),
      DequeueError::Inconsistent => write!(f, "wait completed but no take had a terminal outcome"),
    }
  }
}

/// Error returned by `try_dequeue` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryDequeueError {
  /// No cached value and no take completed on the spot.
  Empty,
}
impl std::error::Error for TryDequeueError {}
impl fmt::Display for TryDequeueError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryDequeueError::Empty => write!(f, "no value ready"),
    }
  }
}
