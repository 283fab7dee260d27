//! `herald-registry` holds the in-memory set of broadcast destinations.
//!
//! The registry is owned by whoever constructs it and shared behind an `Arc`.
//! Broadcasts never read it directly: they take a [`Snapshot`] first, so
//! operators can keep adding and removing channels while a run is in flight.

pub mod error;
pub mod registry;
pub mod snapshot;

pub use error::RegistryError;
pub use registry::DestinationRegistry;
pub use snapshot::Snapshot;
