// src/source.rs

//! The boundary contract between a multiplexer and the sources it drains.
//!
//! A [`Source`] is an asynchronous provider of values. The multiplexer does
//! not care where the values come from (a channel, a socket, a generator, a
//! script); it only requires that each call to [`Source::take_next`] hands
//! back an independently pollable handle that resolves exactly once.

use crate::error::TakeError;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Handle for one in-flight take.
///
/// Resolves exactly once: to a value, to [`TakeError::Failed`], or to
/// [`TakeError::Cancelled`]. The multiplexer may hold the handle across an
/// arbitrary number of its own polls, including across separate dequeue
/// calls, before the handle resolves.
pub type TakeFuture<T> = BoxFuture<'static, Result<T, TakeError>>;

/// Shared, type-erased source handle as stored by a multiplexer.
pub type SourceHandle<T> = Arc<dyn Source<Item = T>>;

/// An asynchronous provider of values for a multiplexer to race.
///
/// Implementations own their state and are free to be drained by other
/// consumers concurrently; the multiplexer only promises that it never holds
/// more than one unresolved take per source at a time.
///
/// `take_next` takes `&self`: a source must be able to start a new take
/// without exclusive access, since the multiplexer keeps every source behind
/// a shared handle. Interior mutability (a mutex around an iterator, a
/// channel receiver, an offset) is the expected shape.
pub trait Source: Send + Sync {
  /// The type of value this source produces.
  type Item: Send;

  /// Begins taking the next value from this source.
  ///
  /// `cancel` is the consumer's cancellation signal, cloned per take.
  /// Observing it is optional: a source that ignores the signal still works,
  /// its take simply keeps running after the consumer has given up, and the
  /// result is cached for a later dequeue instead of being lost.
  ///
  /// A source that is permanently exhausted should return a handle that
  /// never resolves rather than one that fails immediately. A take that
  /// fails is retired and the source is re-launched on the next pass, so an
  /// instantly-failing source would turn the dequeue loop into a spin.
  fn take_next(&self, cancel: CancellationToken) -> TakeFuture<Self::Item>;
}
