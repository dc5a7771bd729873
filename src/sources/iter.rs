// src/sources/iter.rs

use crate::source::{Source, TakeFuture};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use std::fmt;
use std::future;
use std::sync::Arc;

/// A source that serves the items of an iterator, one per take, and parks
/// forever once the iterator is exhausted.
///
/// Every take completes on its first poll, so an `IterSource` always wins
/// a race against suspended competitors. Clones share the underlying
/// iterator and draw from the same sequence.
pub struct IterSource<I> {
  items: Arc<Mutex<I>>,
}

/// Creates a source that yields each item of `iterable` in order.
pub fn iter<I>(iterable: I) -> IterSource<I::IntoIter>
where
  I: IntoIterator,
{
  IterSource {
    items: Arc::new(Mutex::new(iterable.into_iter())),
  }
}

impl<I> Source for IterSource<I>
where
  I: Iterator + Send + 'static,
  I::Item: Send + 'static,
{
  type Item = I::Item;

  fn take_next(&self, _cancel: CancellationToken) -> TakeFuture<Self::Item> {
    let items = Arc::clone(&self.items);
    Box::pin(async move {
      // The guard must not live across an await.
      let next = items.lock().next();
      match next {
        Some(value) => Ok(value),
        None => future::pending().await,
      }
    })
  }
}

impl<I> Clone for IterSource<I> {
  fn clone(&self) -> Self {
    Self {
      items: Arc::clone(&self.items),
    }
  }
}

impl<I> fmt::Debug for IterSource<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IterSource").finish_non_exhaustive()
  }
}
