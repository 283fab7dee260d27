use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use herald_core::{Destination, DestinationId, Selector};

use crate::error::{RegistryError, Result};
use crate::snapshot::Snapshot;

/// Thread-safe, insertion-ordered set of broadcast destinations.
///
/// Every operation takes the single lock for its whole duration, so
/// mutations are mutually exclusive with each other and with [`snapshot`]:
/// a snapshot never observes a half-applied change. No lock is held across
/// an `.await`, and broadcasts only ever read snapshots, so registry calls
/// never wait on delivery.
///
/// [`snapshot`]: DestinationRegistry::snapshot
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    destinations: RwLock<Vec<Destination>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination. Fails if the normalized identifier is already present.
    pub fn add(&self, id: DestinationId) -> Result<Destination> {
        let mut destinations = self.write();
        if destinations.iter().any(|d| d.id == id) {
            debug!(destination = %id, "duplicate destination rejected");
            return Err(RegistryError::DuplicateDestination { id: id.to_string() });
        }
        let destination = Destination::new(id);
        destinations.push(destination.clone());
        info!(destination = %destination, total = destinations.len(), "destination added");
        Ok(destination)
    }

    /// Remove the destination matched by `selector` and return it.
    pub fn remove(&self, selector: &Selector) -> Result<Destination> {
        let mut destinations = self.write();
        let index = match selector {
            Selector::Position(n) => n.checked_sub(1).filter(|i| *i < destinations.len()),
            Selector::Id(id) => destinations.iter().position(|d| &d.id == id),
        };
        let Some(index) = index else {
            return Err(RegistryError::NotFound {
                selector: selector.to_string(),
            });
        };
        let removed = destinations.remove(index);
        info!(destination = %removed, remaining = destinations.len(), "destination removed");
        Ok(removed)
    }

    /// Remove everything. Returns how many destinations were dropped (0 is fine).
    pub fn clear(&self) -> usize {
        let mut destinations = self.write();
        let count = destinations.len();
        destinations.clear();
        if count > 0 {
            info!(count, "registry cleared");
        }
        count
    }

    /// Current destinations in insertion order.
    pub fn list(&self) -> Vec<Destination> {
        self.read().clone()
    }

    pub fn size(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, id: &DestinationId) -> bool {
        self.read().iter().any(|d| &d.id == id)
    }

    /// Independent copy of the current contents for a broadcast run.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.read().clone())
    }

    // A panic while holding the lock cannot leave the Vec half-updated
    // (every mutation is a single push/remove/clear), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Destination>> {
        self.destinations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Destination>> {
        self.destinations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
