//! # Receiver Registry
//!
//! Tracks which modules each associated receiver can service.
//!
//! ## Invariants
//! - A receiver's module set exists only while the receiver is associated.
//!   Removing the receiver withdraws every module it announced.
//! - Sets have membership semantics only: no ordering, no duplicates.
//! - All operations take `&self`; the map and each set shard their own locks, so
//!   announcements from the network never block dispatch lookups on other
//!   receivers.

use std::fmt;

use dashmap::DashMap;
use dashmap::DashSet;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::module_id::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    modules: DashMap<ReceiverId, DashSet<ModuleId>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a receiver with an empty module set.
    ///
    /// Returns false if the receiver was already tracked.
    pub fn add_receiver(&self, receiver: ReceiverId) -> bool {
        match self.modules.entry(receiver) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(DashSet::new());
                true
            }
        }
    }

    /// Stops tracking a receiver, returning how many modules it had.
    pub fn remove_receiver(&self, receiver: ReceiverId) -> Option<usize> {
        let (_, set) = self.modules.remove(&receiver)?;
        debug!(receiver = %receiver, withdrawn = set.len(), "Receiver removed");
        Some(set.len())
    }

    pub fn contains_receiver(&self, receiver: ReceiverId) -> bool {
        self.modules.contains_key(&receiver)
    }

    /// Returns true if the module was not yet registered for this receiver.
    ///
    /// Unknown receivers register nothing.
    pub fn register(&self, receiver: ReceiverId, module: ModuleId) -> bool {
        let Some(set) = self.modules.get(&receiver) else {
            return false;
        };
        let added = set.insert(module.clone());
        if added {
            debug!(receiver = %receiver, module = %module, "Module registered");
        }
        added
    }

    /// Returns true if the module was registered for this receiver.
    pub fn deregister(&self, receiver: ReceiverId, module: &ModuleId) -> bool {
        let Some(set) = self.modules.get(&receiver) else {
            return false;
        };
        let removed = set.remove(module).is_some();
        if removed {
            debug!(receiver = %receiver, module = %module, "Module deregistered");
        }
        removed
    }

    pub fn accepts(&self, receiver: ReceiverId, module: &ModuleId) -> bool {
        self.modules.get(&receiver).is_some_and(|set| set.contains(module))
    }

    /// A snapshot of the modules a receiver currently accepts.
    pub fn modules(&self, receiver: ReceiverId) -> Vec<ModuleId> {
        self.modules
            .get(&receiver)
            .map(|set| set.iter().map(|m| m.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Every receiver accepting `module`, lowest id first.
    pub fn receivers_accepting(&self, module: &ModuleId) -> Vec<ReceiverId> {
        let mut out: Vec<ReceiverId> = self
            .modules
            .iter()
            .filter(|entry| entry.value().contains(module))
            .map(|entry| *entry.key())
            .collect();
        out.sort();
        out
    }
}
