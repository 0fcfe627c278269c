//! Shared helpers for registry integration tests.

#![allow(dead_code)]

use fd_registry::{Fd, Interest, ReadinessEngine, Registry};

/// A call received by [`RecordingEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// Descriptor and the private value present at the time of the call.
    Register(Fd, Option<u32>),
    Unregister(Fd, Option<u32>),
    Update(Fd, Interest),
}

/// Engine that records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<Call>,
}

impl RecordingEngine {
    /// Number of interest updates received for `fd`.
    pub fn updates_for(&self, fd: Fd) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Update(f, _) if *f == fd))
            .count()
    }

    /// Last interest update received for `fd`.
    pub fn last_update(&self, fd: Fd) -> Option<Interest> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Update(f, interest) if *f == fd => Some(*interest),
            _ => None,
        })
    }
}

impl ReadinessEngine for RecordingEngine {
    type Private = u32;

    fn register(&mut self, fd: Fd, private: &mut Option<u32>) {
        self.calls.push(Call::Register(fd, *private));
    }

    fn unregister(&mut self, fd: Fd, private: &mut Option<u32>) {
        self.calls.push(Call::Unregister(fd, *private));
    }

    fn update_interest(&mut self, fd: Fd, interest: Interest, _private: &mut Option<u32>) {
        self.calls.push(Call::Update(fd, interest));
    }
}

pub const CAPACITY: usize = 16;

/// Owner payload used by the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub &'static str);

pub fn registry() -> Registry<Owner, RecordingEngine> {
    Registry::new(CAPACITY, RecordingEngine::default())
}
