//! Fan-in multiplexing for independently-owned asynchronous sources.
//!
//! Manifold races one outstanding take per source and hands the winners to
//! exactly one consumer, in completion order with index-order tie-breaks.
//! Failed takes are swallowed and their sources retried, completed but
//! unclaimed values are cached so nothing is ever lost, and caller
//! cancellation aborts the wait without tearing down in-flight work.

pub mod error;

// Core multiplexer, the source contract and the shipped sources
pub mod mux;
pub mod source;
pub mod sources;
pub mod telemetry;

// Public re-exports for convenience
pub use error::{DequeueError, EmptySources, TakeError, TryDequeueError};
pub use mux::{DequeueFuture, Multiplexer};
pub use source::{Source, SourceHandle, TakeFuture};

// The cancellation signal is part of the public API surface.
pub use tokio_util::sync::CancellationToken;
