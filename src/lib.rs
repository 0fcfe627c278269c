//! fd-registry - descriptor bookkeeping for a single-process network server.
//!
//! Every open descriptor the server owns (listening sockets, client
//! connections, ident and resolver sockets, helper pipes) is tracked in a
//! fixed-capacity table indexed by descriptor number. The [`Registry`] keeps
//! that table and a pluggable [`ReadinessEngine`] in step: by the time a
//! registry call returns, the engine already watches exactly what the table
//! says it should.
//!
//! # Quick Start
//!
//! ```ignore
//! use fd_registry::{DescriptorType, Interest, MioEngine, Registry};
//! use std::os::unix::io::AsRawFd;
//! use std::time::Duration;
//!
//! let mut registry = Registry::new(1024, MioEngine::new()?);
//!
//! let listener = std::net::TcpListener::bind("127.0.0.1:7000")?;
//! listener.set_nonblocking(true)?;
//! registry.register(listener.as_raw_fd(), DescriptorType::Listener, ());
//! registry.set_interest(listener.as_raw_fd(), Interest::READ);
//!
//! loop {
//!     registry.engine_mut().poll(Some(Duration::from_millis(100)))?;
//!
//!     for ready in registry.engine_mut().drain_ready() {
//!         let (kind, _interest, _owner) = registry.get_info(ready.fd);
//!         // dispatch on kind
//!     }
//! }
//! ```

pub mod config;
pub mod echo;
mod engine;
pub mod logging;
pub mod mio;
pub mod policy;
mod registry;
pub mod signal;
pub mod table;
mod types;

// Re-exports
pub use config::{Config, ConfigError, LogFormat};
pub use engine::ReadinessEngine;
pub use self::mio::{MioEngine, Readiness, Watch};
pub use policy::{ClientAuth, IdentHandshake, check_client};
pub use registry::Registry;
pub use types::{DescriptorType, Fd, Interest};
