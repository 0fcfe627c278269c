//! Descriptor registry.
//!
//! The registry is the single source of truth for every open descriptor the
//! server owns. Connection logic calls into it whenever a descriptor is
//! created, reclassified, moved to a new number or closed, and it keeps the
//! readiness engine in step before each call returns.
//!
//! # Contract Violations
//!
//! Passing an out-of-range descriptor, registering an occupied descriptor or
//! operating on a free one means the caller has lost track of descriptor
//! lifecycle. These panic in every build profile. They are never reported as
//! errors, since continuing could cross-wire one connection's I/O with
//! another's.
//!
//! # Example
//!
//! ```ignore
//! use fd_registry::{DescriptorType, Interest, MioEngine, Registry};
//!
//! let mut registry = Registry::new(1024, MioEngine::new()?);
//!
//! registry.register(fd, DescriptorType::Client, conn_key);
//! registry.set_interest(fd, Interest::READ);
//!
//! // ... later, before closing the socket
//! let conn_key = registry.unregister(fd);
//! ```

use crate::engine::ReadinessEngine;
use crate::table::DescriptorTable;
use crate::types::{DescriptorType, Fd, Interest};
use tracing::trace;

/// Fixed-capacity registry of open descriptors.
///
/// `O` is the owner payload stored with each descriptor, usually a handle to
/// the connection object that owns it. `E` is the readiness engine notified
/// of every change that affects what it must watch.
pub struct Registry<O, E: ReadinessEngine> {
    table: DescriptorTable<O, E::Private>,
    engine: E,
}

impl<O, E: ReadinessEngine> Registry<O, E> {
    /// Create a registry for descriptors `0..capacity` with all slots free.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than the largest descriptor.
    pub fn new(capacity: usize, engine: E) -> Self {
        Self {
            table: DescriptorTable::new(capacity),
            engine,
        }
    }

    /// Reset every slot to free without notifying the engine.
    ///
    /// Only valid at startup, before any descriptor is registered. Calling it
    /// later silently drops all live state.
    pub fn init(&mut self) {
        self.table.init();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of registered descriptors.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns `true` if `fd` is registered.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is out of range.
    pub fn is_registered(&self, fd: Fd) -> bool {
        self.table.get(fd).is_some()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Iterate over registered descriptors and their classification.
    pub fn descriptors(&self) -> impl Iterator<Item = (Fd, DescriptorType)> + '_ {
        self.table.iter().map(|(fd, entry)| (fd, entry.kind()))
    }

    /// Register a free descriptor.
    ///
    /// The descriptor starts with an empty interest mask and no engine
    /// private value. The engine is told to begin tracking it.
    pub fn register(&mut self, fd: Fd, kind: DescriptorType, owner: O) {
        let entry = self.table.occupy(fd, kind, owner);
        trace!(fd, %kind, "register");
        self.engine.register(fd, &mut entry.private);
    }

    /// Unregister a descriptor and hand back its owner payload.
    ///
    /// The engine is told to stop tracking it while the private value is
    /// still attached; the slot is cleared afterwards.
    pub fn unregister(&mut self, fd: Fd) -> O {
        let entry = self.table.occupied_mut(fd);
        trace!(fd, kind = %entry.kind, interest = ?entry.interest, "unregister");
        self.engine.unregister(fd, &mut entry.private);
        self.table.take(fd).owner
    }

    /// Move a registered descriptor's full state to a new descriptor number.
    ///
    /// Used when a live connection continues under a different OS descriptor.
    /// Kind, owner, interest and private value move untouched; `old` becomes
    /// free without an engine unregister (the connection is not closing) and
    /// the engine is told to register `new`, receiving the moved private
    /// value so it can restore the watch.
    ///
    /// Call this while `old` is still open. An engine that keys kernel state
    /// by descriptor number (such as [`MioEngine`](crate::MioEngine)) drops
    /// the entry for `old` here, which it cannot do once `old` is closed.
    pub fn remap(&mut self, old: Fd, new: Fd) {
        self.table.occupied(old);
        self.table.assert_free(new);

        let entry = self.table.take(old);
        trace!(old, new, kind = %entry.kind, interest = ?entry.interest, "remap");
        let entry = self.table.place(new, entry);
        self.engine.register(new, &mut entry.private);
    }

    /// Add `flags` to the descriptor's interest mask.
    ///
    /// The engine is only notified if the mask actually changed.
    pub fn set_interest(&mut self, fd: Fd, flags: Interest) {
        self.update_interest(fd, "set_interest", flags, |current| current | flags);
    }

    /// Remove `flags` from the descriptor's interest mask.
    ///
    /// The engine is only notified if the mask actually changed.
    pub fn clear_interest(&mut self, fd: Fd, flags: Interest) {
        self.update_interest(fd, "clear_interest", flags, |current| current & !flags);
    }

    fn update_interest(
        &mut self,
        fd: Fd,
        op: &'static str,
        flags: Interest,
        apply: impl FnOnce(Interest) -> Interest,
    ) {
        let entry = self.table.occupied_mut(fd);
        let old = entry.interest;
        let new = apply(old);

        trace!(fd, op, ?flags, ?old, ?new, "interest");

        if new != old {
            entry.interest = new;
            self.engine.update_interest(fd, new, &mut entry.private);
        }
    }

    /// Classification, interest mask and owner of a registered descriptor.
    pub fn get_info(&self, fd: Fd) -> (DescriptorType, Interest, &O) {
        let entry = self.table.occupied(fd);
        (entry.kind, entry.interest, &entry.owner)
    }

    /// Interest mask of a registered descriptor.
    pub fn get_interest(&self, fd: Fd) -> Interest {
        self.table.occupied(fd).interest
    }

    /// Mutable access to a registered descriptor's owner payload.
    pub fn owner_mut(&mut self, fd: Fd) -> &mut O {
        &mut self.table.occupied_mut(fd).owner
    }

    /// Attach an engine private value, replacing any previous one.
    pub fn attach_private(&mut self, fd: Fd, value: E::Private) {
        self.table.occupied_mut(fd).private = Some(value);
    }

    /// Engine private value attached to a registered descriptor.
    pub fn get_private(&self, fd: Fd) -> Option<&E::Private> {
        self.table.occupied(fd).private.as_ref()
    }
}
