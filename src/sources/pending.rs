// src/sources/pending.rs

use crate::source::{Source, TakeFuture};
use tokio_util::sync::CancellationToken;

use std::fmt;
use std::future;
use std::marker::PhantomData;

/// A source that never produces anything; see [`pending`].
pub struct PendingSource<T> {
  _marker: PhantomData<fn() -> T>,
}

/// Creates a source whose takes never resolve.
///
/// Useful as a placeholder slot, and in tests that need a source that is
/// permanently quiet without being closed or failed.
pub fn pending<T: Send + 'static>() -> PendingSource<T> {
  PendingSource { _marker: PhantomData }
}

impl<T: Send + 'static> Source for PendingSource<T> {
  type Item = T;

  fn take_next(&self, _cancel: CancellationToken) -> TakeFuture<T> {
    Box::pin(future::pending())
  }
}

impl<T> fmt::Debug for PendingSource<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PendingSource")
  }
}
