//! Interest policy for client connections during authentication.
//!
//! A freshly accepted client may be running an ident handshake on a separate
//! descriptor or waiting on name resolution before its own socket should be
//! read. [`check_client`] is called whenever that sub-state changes and
//! brings the registry's interest masks in line with it.

use crate::engine::ReadinessEngine;
use crate::registry::Registry;
use crate::types::{Fd, Interest};

/// An ident (reverse identification) handshake in progress for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentHandshake {
    /// Descriptor of the outbound ident connection.
    pub fd: Fd,
    /// The ident request still has to be written.
    pub response_pending: bool,
}

/// Read-only view of a client's authentication sub-state.
pub trait ClientAuth {
    /// Descriptor of the client connection itself.
    fn fd(&self) -> Fd;

    /// The ident handshake, if one is running.
    fn ident(&self) -> Option<IdentHandshake>;

    /// Name resolution for the client's address is still running.
    fn resolving(&self) -> bool;
}

/// Apply the interest policy for `client`.
///
/// - While an ident handshake runs, only its descriptor is watched: always
///   for reads, and for writes exactly when the request is still pending.
/// - While resolving (and not doing ident) nothing changes.
/// - Otherwise the client descriptor is watched for reads.
///
/// Calling this again with unchanged state does not reach the engine.
pub fn check_client<O, E, C>(registry: &mut Registry<O, E>, client: &C)
where
    E: ReadinessEngine,
    C: ClientAuth + ?Sized,
{
    if let Some(ident) = client.ident() {
        registry.set_interest(ident.fd, Interest::READ);

        if ident.response_pending {
            registry.set_interest(ident.fd, Interest::WRITE);
        } else {
            registry.clear_interest(ident.fd, Interest::WRITE);
        }

        return;
    }

    if client.resolving() {
        return;
    }

    registry.set_interest(client.fd(), Interest::READ);
}
