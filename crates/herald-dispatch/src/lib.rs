//! `herald-dispatch` fans one message out to a snapshot of destinations.
//!
//! # Overview
//!
//! [`Dispatcher::dispatch`] drives a pool of at most `pool_size` concurrent
//! sends through an injected [`DeliverySender`]. Outcomes are folded one at a
//! time into an aggregator owned by the run, and a [`ProgressSink`] sees the
//! running counts after each one. Delivery failures never fail the call; they
//! end up in the [`BroadcastReport`](herald_core::BroadcastReport).
//!
//! [`BroadcastService`] sits on top: it owns the registry, the dispatcher and
//! the running stats, and maps each operator [`Intent`](herald_core::Intent)
//! to one operation.

pub mod dispatcher;
pub mod error;
pub mod progress;
pub mod report;
pub mod sender;
pub mod service;
pub mod stats;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use progress::{NoProgress, ProgressSink};
pub use sender::{DeliverySender, SendError};
pub use service::{BroadcastService, IntentReply};
pub use stats::{BroadcastStats, StatsSnapshot};
