use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::player::PlayerId;

/// Players that AI must currently ignore.
///
/// Shared as `Arc<GhostRegistry>` between the relay delivery path (writer) and
/// every AI decision call site (readers, possibly on worker threads). All
/// operations are individually atomic; callers never hold a lock across calls.
#[derive(Debug, Default)]
pub struct GhostRegistry {
    members: RwLock<HashSet<PlayerId>>,
    // Mirrors members.len(), only written under the write lock.
    len: AtomicUsize,
}

impl GhostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.read().contains(id)
    }

    /// Returns true if the player was not already a ghost.
    pub fn add(&self, id: impl Into<PlayerId>) -> bool {
        let mut members = self.members.write();
        let inserted = members.insert(id.into());
        self.len.store(members.len(), Ordering::Release);
        inserted
    }

    /// Returns true if the player was a ghost.
    pub fn remove(&self, id: &str) -> bool {
        let mut members = self.members.write();
        let removed = members.remove(id);
        self.len.store(members.len(), Ordering::Release);
        removed
    }

    pub fn count(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Lock-free emptiness check for the AI hot path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len.load(Ordering::Acquire) == 0
    }

    pub fn members(&self) -> Vec<PlayerId> {
        let mut members: Vec<PlayerId> = self.members.read().iter().cloned().collect();
        members.sort();
        members
    }

    /// Session teardown. Nothing carries over to the next raid.
    pub fn clear(&self) {
        let mut members = self.members.write();
        members.clear();
        self.len.store(0, Ordering::Release);
    }
}
