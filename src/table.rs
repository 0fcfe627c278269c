//! Fixed-capacity descriptor table.
//!
//! Pure storage indexed directly by descriptor number. The table checks the
//! range and occupancy contracts on every access; everything else (engine
//! notification, interest bookkeeping) lives in [`Registry`].
//!
//! [`Registry`]: crate::Registry

use crate::types::{DescriptorType, Fd, Interest};

/// State of an occupied descriptor.
///
/// A free descriptor has no entry at all, so a free slot can never carry a
/// stale owner, interest mask or private value.
pub struct Entry<O, P> {
    pub(crate) kind: DescriptorType,
    pub(crate) owner: O,
    pub(crate) interest: Interest,
    pub(crate) private: Option<P>,
}

impl<O, P> Entry<O, P> {
    fn new(kind: DescriptorType, owner: O) -> Self {
        Self {
            kind,
            owner,
            interest: Interest::empty(),
            private: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> DescriptorType {
        self.kind
    }

    #[inline]
    pub fn owner(&self) -> &O {
        &self.owner
    }

    #[inline]
    pub fn interest(&self) -> Interest {
        self.interest
    }

    #[inline]
    pub fn private(&self) -> Option<&P> {
        self.private.as_ref()
    }
}

/// Fixed-size array of slots, one per descriptor number.
pub struct DescriptorTable<O, P> {
    slots: Box<[Option<Entry<O, P>>]>,
    occupied: usize,
}

impl<O, P> DescriptorTable<O, P> {
    /// Create a table for descriptors `0..capacity`, all free.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit in a descriptor number.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity <= Fd::MAX as usize,
            "descriptor table capacity {capacity} must be in 1..={}",
            Fd::MAX
        );

        Self {
            slots: (0..capacity).map(|_| None).collect(),
            occupied: 0,
        }
    }

    /// Reset every slot to free.
    ///
    /// Meant for process startup. Any live state is dropped without telling
    /// anyone, so calling this with descriptors still registered leaves the
    /// readiness engine watching descriptors the table no longer knows about.
    pub fn init(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.occupied = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Validate that `fd` lies in `[0, capacity)` and return it as an index.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range descriptor.
    #[inline]
    pub fn index(&self, fd: Fd) -> usize {
        assert!(
            fd >= 0 && (fd as usize) < self.slots.len(),
            "descriptor {fd} out of range [0, {})",
            self.slots.len()
        );
        fd as usize
    }

    /// Range-checked access to a slot in any state.
    #[inline]
    pub fn get(&self, fd: Fd) -> Option<&Entry<O, P>> {
        self.slots[self.index(fd)].as_ref()
    }

    /// Access to a slot that must be occupied.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is out of range or free.
    #[inline]
    pub fn occupied(&self, fd: Fd) -> &Entry<O, P> {
        match self.get(fd) {
            Some(entry) => entry,
            None => panic!("descriptor {fd} is not registered"),
        }
    }

    /// Mutable access to a slot that must be occupied.
    #[inline]
    pub fn occupied_mut(&mut self, fd: Fd) -> &mut Entry<O, P> {
        let idx = self.index(fd);
        match self.slots[idx].as_mut() {
            Some(entry) => entry,
            None => panic!("descriptor {fd} is not registered"),
        }
    }

    /// Assert that `fd` is in range and free.
    #[inline]
    pub fn assert_free(&self, fd: Fd) {
        assert!(self.get(fd).is_none(), "descriptor {fd} is already registered");
    }

    /// Occupy a free slot with a fresh entry and return it.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is out of range or already occupied.
    pub fn occupy(&mut self, fd: Fd, kind: DescriptorType, owner: O) -> &mut Entry<O, P> {
        self.place(fd, Entry::new(kind, owner))
    }

    /// Move an occupied entry out, leaving the descriptor free.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is out of range or free.
    pub fn take(&mut self, fd: Fd) -> Entry<O, P> {
        let idx = self.index(fd);
        match self.slots[idx].take() {
            Some(entry) => {
                self.occupied -= 1;
                entry
            }
            None => panic!("descriptor {fd} is not registered"),
        }
    }

    /// Put an entry at a free descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is out of range or already occupied.
    pub fn place(&mut self, fd: Fd, entry: Entry<O, P>) -> &mut Entry<O, P> {
        self.assert_free(fd);
        let idx = fd as usize;
        self.occupied += 1;
        self.slots[idx].insert(entry)
    }

    /// Iterate over occupied slots in descriptor order.
    pub fn iter(&self) -> impl Iterator<Item = (Fd, &Entry<O, P>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|entry| (idx as Fd, entry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = DescriptorTable<u32, ()>;

    #[test]
    fn test_new_table_is_free() {
        let table = Table::new(16);
        assert_eq!(table.capacity(), 16);
        assert!(table.is_empty());
        for fd in 0..16 {
            assert!(table.get(fd).is_none());
        }
    }

    #[test]
    fn test_occupy_starts_clean() {
        let mut table = Table::new(8);
        table.occupy(3, DescriptorType::Client, 42);
        assert_eq!(table.len(), 1);

        let entry = table.occupied(3);
        assert_eq!(entry.kind(), DescriptorType::Client);
        assert_eq!(entry.owner(), &42);
        assert!(entry.interest().is_empty());
        assert!(entry.private().is_none());
    }

    #[test]
    fn test_take_frees_slot() {
        let mut table = Table::new(8);
        table.occupy(3, DescriptorType::Client, 42);

        let entry = table.take(3);
        assert_eq!(entry.owner, 42);
        assert!(table.get(3).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_init_clears_everything() {
        let mut table = Table::new(4);
        table.occupy(0, DescriptorType::Listener, 1);
        table.occupy(2, DescriptorType::Client, 2).interest = Interest::READ;

        table.init();

        assert!(table.is_empty());
        assert!(table.get(0).is_none());
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut table = Table::new(8);
        table.occupy(1, DescriptorType::Listener, 10);
        table.occupy(6, DescriptorType::Client, 60);

        let fds: Vec<Fd> = table.iter().map(|(fd, _)| fd).collect();
        assert_eq!(fds, vec![1, 6]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_negative_fd_panics() {
        let table = Table::new(8);
        table.get(-1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_fd_at_capacity_panics() {
        let table = Table::new(8);
        table.get(8);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_occupy_twice_panics() {
        let mut table = Table::new(8);
        table.occupy(2, DescriptorType::Client, 1);
        table.occupy(2, DescriptorType::Client, 2);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_take_free_panics() {
        let mut table = Table::new(8);
        table.take(5);
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn test_zero_capacity_panics() {
        let _ = Table::new(0);
    }
}
