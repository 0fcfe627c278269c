//! Readiness engine trait definition.

use crate::types::{Fd, Interest};

/// Trait for the readiness-notification mechanism behind the registry.
///
/// The registry calls these entry points synchronously from inside its own
/// operations, so by the time a registry call returns the engine already
/// reflects the change. The calls are notifications, not requests: an engine
/// that hits an internal failure deals with it itself (typically by logging).
///
/// Each entry point receives the descriptor's private slot. The engine may
/// store whatever it needs there ([`Private`](Self::Private)); the registry
/// only keeps it alongside the descriptor and moves it on remap.
///
/// # Call Order
///
/// - `register` after a descriptor becomes occupied, and after a remap with
///   the moved private value already in place.
/// - `update_interest` whenever the interest mask actually changes.
/// - `unregister` before the slot is cleared, with the private value still
///   present.
pub trait ReadinessEngine {
    /// Per-descriptor data owned by the engine.
    type Private;

    /// Begin tracking `fd`.
    fn register(&mut self, fd: Fd, private: &mut Option<Self::Private>);

    /// Stop tracking `fd`. The slot is cleared after this returns.
    fn unregister(&mut self, fd: Fd, private: &mut Option<Self::Private>);

    /// Change which readiness events are watched for `fd`.
    fn update_interest(&mut self, fd: Fd, interest: Interest, private: &mut Option<Self::Private>);
}
