use std::collections::HashSet;

use chrono::{DateTime, Utc};

use herald_core::Destination;

/// Ordered, point-in-time copy of the registry.
///
/// Owns its destinations outright; later registry mutations are invisible to it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    destinations: Vec<Destination>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            taken_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn as_slice(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Destination> {
        self.destinations.iter()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// First destination that appears more than once, if any.
    ///
    /// Snapshots taken from a registry never contain one; hand-built ones might.
    pub fn first_duplicate(&self) -> Option<&Destination> {
        let mut seen = HashSet::with_capacity(self.destinations.len());
        self.destinations.iter().find(|d| !seen.insert(&d.id))
    }

    pub fn into_vec(self) -> Vec<Destination> {
        self.destinations
    }
}

impl From<Vec<Destination>> for Snapshot {
    fn from(destinations: Vec<Destination>) -> Self {
        Self::new(destinations)
    }
}

impl IntoIterator for Snapshot {
    type Item = Destination;
    type IntoIter = std::vec::IntoIter<Destination>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.into_iter()
    }
}
