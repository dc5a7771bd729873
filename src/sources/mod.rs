// src/sources/mod.rs

//! Ready-made [`Source`](crate::Source) implementations.
//!
//! These cover the common shapes a multiplexer is fed with: ready data
//! ([`iter`]), custom per-take logic ([`from_fn`]), a permanently quiet
//! placeholder ([`pending`]) and, behind the `tokio` feature, adapters for
//! draining `tokio::sync::mpsc` channels.

mod from_fn;
mod iter;
mod pending;

#[cfg(feature = "tokio")]
mod mpsc;

pub use from_fn::{from_fn, FnSource};
pub use iter::{iter, IterSource};
pub use pending::{pending, PendingSource};

#[cfg(feature = "tokio")]
pub use mpsc::{MpscSource, UnboundedMpscSource};
