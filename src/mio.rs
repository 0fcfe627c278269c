//! Mio-based readiness engine using epoll/kqueue.
//!
//! Descriptors are watched under `Token(fd)`, so a readiness event maps
//! straight back to a registry slot. mio cannot watch an empty interest set,
//! so a descriptor is only handed to the kernel once it has some interest and
//! is deregistered again when its interest drops to nothing. Whether the
//! kernel currently watches a descriptor is recorded in its private slot as a
//! [`Watch`].
//!
//! After a remap the watch still names the old descriptor. The engine drops
//! the kernel entry for the old number before watching the new one, so the
//! caller must remap before it closes the old descriptor.

use crate::engine::ReadinessEngine;
use crate::types::{Fd, Interest};
use mio::unix::SourceFd;
use mio::{Events, Poll, Token};
use std::io;
use std::mem;
use std::time::Duration;
use tracing::{trace, warn};

/// Default number of events collected per poll.
const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// Kernel watch state for a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watch {
    fd: Fd,
    interest: mio::Interest,
}

impl Watch {
    /// Descriptor number the kernel watch was registered under.
    pub fn fd(&self) -> Fd {
        self.fd
    }

    /// Interest the kernel is currently watching for.
    pub fn interest(&self) -> Interest {
        let mut interest = Interest::empty();
        if self.interest.is_readable() {
            interest |= Interest::READ;
        }
        if self.interest.is_writable() {
            interest |= Interest::WRITE;
        }
        interest
    }
}

/// Readiness reported for one descriptor by [`MioEngine::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub fd: Fd,
    pub readable: bool,
    pub writable: bool,
    /// The peer closed one or both directions.
    pub closed: bool,
    pub error: bool,
}

/// Mio-based readiness engine.
pub struct MioEngine {
    poll: Poll,
    events: Events,
    ready: Vec<Readiness>,
}

impl MioEngine {
    /// Create a new engine with default settings.
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(DEFAULT_EVENTS_CAPACITY)
    }

    /// Create a new engine collecting up to `events` events per poll.
    pub fn with_capacity(events: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(events),
            ready: Vec::with_capacity(events),
        })
    }

    /// Poll for readiness with an optional timeout.
    ///
    /// Returns the number of readiness reports waiting in
    /// [`drain_ready`](Self::drain_ready). An interrupted wait counts as a
    /// poll with no events.
    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(self.ready.len()),
            Err(e) => return Err(e),
        }

        for event in self.events.iter() {
            self.ready.push(Readiness {
                fd: event.token().0 as Fd,
                readable: event.is_readable(),
                writable: event.is_writable(),
                closed: event.is_read_closed() || event.is_write_closed(),
                error: event.is_error(),
            });
        }

        Ok(self.ready.len())
    }

    /// Take all pending readiness reports.
    pub fn drain_ready(&mut self) -> Vec<Readiness> {
        mem::take(&mut self.ready)
    }

    fn watch(&mut self, fd: Fd, interest: mio::Interest, rewatch: bool) -> io::Result<Watch> {
        let registry = self.poll.registry();
        let mut source = SourceFd(&fd);
        if rewatch {
            registry.reregister(&mut source, Token(fd as usize), interest)?;
        } else {
            registry.register(&mut source, Token(fd as usize), interest)?;
        }
        Ok(Watch { fd, interest })
    }

    fn unwatch(&mut self, fd: Fd) {
        if let Err(e) = self.poll.registry().deregister(&mut SourceFd(&fd)) {
            warn!(fd, error = %e, "failed to deregister descriptor");
        }
    }
}

fn to_mio(interest: Interest) -> Option<mio::Interest> {
    match (
        interest.contains(Interest::READ),
        interest.contains(Interest::WRITE),
    ) {
        (true, true) => Some(mio::Interest::READABLE | mio::Interest::WRITABLE),
        (true, false) => Some(mio::Interest::READABLE),
        (false, true) => Some(mio::Interest::WRITABLE),
        (false, false) => None,
    }
}

impl ReadinessEngine for MioEngine {
    type Private = Watch;

    fn register(&mut self, fd: Fd, private: &mut Option<Watch>) {
        // A watch is only present here when the slot was remapped from
        // another descriptor: carry it over to the new number.
        if let Some(watch) = *private {
            trace!(fd, old = watch.fd, interest = ?watch.interest(), "rewatch remapped descriptor");
            if watch.fd != fd {
                self.unwatch(watch.fd);
            }
            match self.watch(fd, watch.interest, false) {
                Ok(watch) => *private = Some(watch),
                Err(e) => {
                    warn!(fd, error = %e, "failed to watch remapped descriptor");
                    *private = None;
                }
            }
        }
    }

    fn unregister(&mut self, fd: Fd, private: &mut Option<Watch>) {
        if private.take().is_some() {
            self.unwatch(fd);
        }
    }

    fn update_interest(&mut self, fd: Fd, interest: Interest, private: &mut Option<Watch>) {
        match (to_mio(interest), private.is_some()) {
            (None, false) => {}
            (None, true) => {
                self.unwatch(fd);
                *private = None;
            }
            (Some(wanted), watched) => match self.watch(fd, wanted, watched) {
                Ok(watch) => *private = Some(watch),
                Err(e) => warn!(fd, ?interest, error = %e, "failed to update descriptor interest"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mio() {
        assert_eq!(to_mio(Interest::empty()), None);
        assert_eq!(to_mio(Interest::READ), Some(mio::Interest::READABLE));
        assert_eq!(to_mio(Interest::WRITE), Some(mio::Interest::WRITABLE));
        assert_eq!(
            to_mio(Interest::READ | Interest::WRITE),
            Some(mio::Interest::READABLE | mio::Interest::WRITABLE)
        );
    }

    #[test]
    fn test_watch_interest() {
        let watch = Watch {
            fd: 3,
            interest: mio::Interest::READABLE | mio::Interest::WRITABLE,
        };
        assert_eq!(watch.fd(), 3);
        assert_eq!(watch.interest(), Interest::all());
    }

    #[test]
    fn test_poll_empty() {
        let mut engine = MioEngine::new().unwrap();
        let count = engine.poll(Some(Duration::from_millis(10))).unwrap();
        assert_eq!(count, 0);
        assert!(engine.drain_ready().is_empty());
    }
}
