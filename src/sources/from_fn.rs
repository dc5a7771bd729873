// src/sources/from_fn.rs

use crate::error::TakeError;
use crate::source::{Source, TakeFuture};
use tokio_util::sync::CancellationToken;

use std::fmt;
use std::future::Future;

/// A source built from a closure; see [`from_fn`].
pub struct FnSource<F> {
  take: F,
}

/// Creates a source whose takes are produced by `take`.
///
/// The closure is invoked once per launch with the consumer's cancellation
/// signal and returns the future for that take. State shared between takes
/// belongs in the closure's captures.
///
/// ```
/// use manifold::sources;
/// use manifold::TakeError;
///
/// // A source that fails every take.
/// let flaky = sources::from_fn(|_cancel| async { Err::<u32, _>(TakeError::Failed) });
/// # let _ = flaky;
/// ```
pub fn from_fn<F, Fut, T>(take: F) -> FnSource<F>
where
  F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, TakeError>> + Send + 'static,
  T: Send + 'static,
{
  FnSource { take }
}

impl<F, Fut, T> Source for FnSource<F>
where
  F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, TakeError>> + Send + 'static,
  T: Send + 'static,
{
  type Item = T;

  fn take_next(&self, cancel: CancellationToken) -> TakeFuture<T> {
    Box::pin((self.take)(cancel))
  }
}

impl<F> fmt::Debug for FnSource<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnSource").finish_non_exhaustive()
  }
}
