// src/sources/mpsc.rs

//! Adapters for draining `tokio::sync::mpsc` receivers through a
//! multiplexer.
//!
//! A channel whose senders are all gone parks forever rather than failing:
//! a closed channel is merely exhausted, not broken, and an instant failure
//! would spin the dequeue loop.

use crate::error::TakeError;
use crate::source::{Source, TakeFuture};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use std::fmt;
use std::future;
use std::sync::Arc;

/// A source that drains a bounded [`mpsc::Receiver`].
///
/// The receiver sits behind an async mutex so the source can start takes
/// from `&self`; the multiplexer never runs two takes against one source
/// at a time, so the lock is uncontended in normal use.
pub struct MpscSource<T> {
  receiver: Arc<AsyncMutex<mpsc::Receiver<T>>>,
}

impl<T> MpscSource<T> {
  /// Wraps `receiver` so a multiplexer can race it.
  pub fn new(receiver: mpsc::Receiver<T>) -> Self {
    MpscSource {
      receiver: Arc::new(AsyncMutex::new(receiver)),
    }
  }
}

impl<T: Send + 'static> Source for MpscSource<T> {
  type Item = T;

  fn take_next(&self, cancel: CancellationToken) -> TakeFuture<T> {
    let receiver = Arc::clone(&self.receiver);
    Box::pin(async move {
      let mut receiver = receiver.lock().await;
      tokio::select! {
        _ = cancel.cancelled() => Err(TakeError::Cancelled),
        received = receiver.recv() => match received {
          Some(value) => Ok(value),
          None => future::pending().await,
        },
      }
    })
  }
}

impl<T> fmt::Debug for MpscSource<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MpscSource").finish_non_exhaustive()
  }
}

/// Unbounded variant of [`MpscSource`].
pub struct UnboundedMpscSource<T> {
  receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> UnboundedMpscSource<T> {
  /// Wraps `receiver` so a multiplexer can race it.
  pub fn new(receiver: mpsc::UnboundedReceiver<T>) -> Self {
    UnboundedMpscSource {
      receiver: Arc::new(AsyncMutex::new(receiver)),
    }
  }
}

impl<T: Send + 'static> Source for UnboundedMpscSource<T> {
  type Item = T;

  fn take_next(&self, cancel: CancellationToken) -> TakeFuture<T> {
    let receiver = Arc::clone(&self.receiver);
    Box::pin(async move {
      let mut receiver = receiver.lock().await;
      tokio::select! {
        _ = cancel.cancelled() => Err(TakeError::Cancelled),
        received = receiver.recv() => match received {
          Some(value) => Ok(value),
          None => future::pending().await,
        },
      }
    })
  }
}

impl<T> fmt::Debug for UnboundedMpscSource<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UnboundedMpscSource").finish_non_exhaustive()
  }
}
