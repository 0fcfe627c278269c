//! Core types shared by the table, the registry and engines.

use std::fmt;

/// Descriptor number as handed out by the operating system.
///
/// Kept signed so that a stray `-1` from a failed syscall is caught by the
/// range check instead of wrapping to a huge index.
pub type Fd = std::os::unix::io::RawFd;

/// Classification of what an occupied descriptor slot represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Listening socket accepting new clients.
    Listener,
    /// Accepted client connection.
    Client,
    /// Reverse-identification (ident) handshake socket for a client.
    Auth,
    /// Name-resolution socket.
    Resolver,
    /// Pipe to a helper process.
    Helper,
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorType::Listener => write!(f, "listener"),
            DescriptorType::Client => write!(f, "client"),
            DescriptorType::Auth => write!(f, "auth"),
            DescriptorType::Resolver => write!(f, "resolver"),
            DescriptorType::Helper => write!(f, "helper"),
        }
    }
}

bitflags::bitflags! {
    /// Readiness events the registry wants reported for a descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interest: u32 {
        /// Report when the descriptor is readable.
        const READ = 1 << 0;
        /// Report when the descriptor is writable.
        const WRITE = 1 << 1;
    }
}
