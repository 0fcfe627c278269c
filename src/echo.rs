//! Line echo server driven by the descriptor registry.
//!
//! The [`Server`] owns the registry for the whole process: the listener and
//! every client socket are registered under their descriptor numbers,
//! readiness comes back from the mio engine keyed by descriptor, and each
//! descriptor is unregistered before its socket is closed.
//!
//! Clients send newline-terminated lines and get each one back. A client
//! that sends a line longer than `max_line` bytes (newline excluded) is
//! disconnected without the line being echoed.

use crate::config::Config;
use crate::{
    ClientAuth, DescriptorType, Fd, IdentHandshake, Interest, MioEngine, Readiness, Registry,
    check_client,
};
use slab::Slab;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 4096;

/// Owner payload stored with each registered descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Listener,
    /// Key into the client slab.
    Client(usize),
}

struct Client {
    stream: TcpStream,
    addr: SocketAddr,
    inbuf: Vec<u8>,
    outbuf: Vec<u8>,
}

impl ClientAuth for Client {
    fn fd(&self) -> Fd {
        self.stream.as_raw_fd()
    }

    // The echo server skips ident and name resolution.
    fn ident(&self) -> Option<IdentHandshake> {
        None
    }

    fn resolving(&self) -> bool {
        false
    }
}

/// Why a client's input was rejected.
enum Overflow {
    Line(usize),
    Partial(usize),
}

pub struct Server {
    registry: Registry<Owner, MioEngine>,
    listener: TcpListener,
    clients: Slab<Client>,
    max_line: usize,
}

impl Server {
    /// Bind the configured listen address and build a server around it.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.echo.listen)?;
        listener.set_nonblocking(true)?;
        Self::new(listener, config)
    }

    /// Build a server around an already bound, non-blocking listener.
    pub fn new(listener: TcpListener, config: &Config) -> io::Result<Self> {
        let mut registry = Registry::new(config.registry.capacity, MioEngine::new()?);

        let fd = listener.as_raw_fd();
        if fd as usize >= registry.capacity() {
            return Err(io::Error::other(format!(
                "listener descriptor {fd} exceeds registry capacity {}",
                registry.capacity()
            )));
        }

        registry.register(fd, DescriptorType::Listener, Owner::Listener);
        registry.set_interest(fd, Interest::READ);

        Ok(Self {
            registry,
            listener,
            clients: Slab::new(),
            max_line: config.echo.max_line,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Registry<Owner, MioEngine> {
        &self.registry
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Serve until `shutdown` is set, then close every descriptor.
    pub fn run(&mut self, shutdown: &AtomicBool) -> io::Result<()> {
        info!(
            address = %self.local_addr()?,
            capacity = self.registry.capacity(),
            "Echo server listening"
        );

        while !shutdown.load(Ordering::Relaxed) {
            self.turn(Some(POLL_TIMEOUT))?;
        }

        self.shutdown();
        Ok(())
    }

    /// Wait for readiness once and handle everything reported.
    pub fn turn(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.registry.engine_mut().poll(timeout)?;

        for ready in self.registry.engine_mut().drain_ready() {
            self.dispatch(ready);
        }
        Ok(())
    }

    /// Unregister and close every descriptor, listener included.
    pub fn shutdown(&mut self) {
        let fds: Vec<Fd> = self.registry.descriptors().map(|(fd, _)| fd).collect();
        for fd in fds {
            if let Owner::Client(key) = self.registry.unregister(fd) {
                self.clients.remove(key);
            }
        }
        info!("All descriptors closed");
    }

    fn dispatch(&mut self, ready: Readiness) {
        // An earlier event in the same batch may have closed this descriptor.
        if !self.registry.is_registered(ready.fd) {
            return;
        }

        let owner = *self.registry.get_info(ready.fd).2;
        match owner {
            Owner::Listener => self.accept(),
            Owner::Client(key) => {
                if ready.readable || ready.closed || ready.error {
                    self.read(key);
                }
                if ready.writable && self.clients.contains(key) {
                    self.flush(key);
                }
            }
        }
    }

    fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let fd = stream.as_raw_fd();
                    if fd as usize >= self.registry.capacity() {
                        warn!(fd, %addr, "Descriptor beyond registry capacity, rejecting client");
                        continue;
                    }
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(fd, %addr, error = %e, "Failed to set client non-blocking");
                        continue;
                    }

                    let key = self.clients.insert(Client {
                        stream,
                        addr,
                        inbuf: Vec::new(),
                        outbuf: Vec::new(),
                    });
                    self.registry.register(fd, DescriptorType::Client, Owner::Client(key));
                    check_client(&mut self.registry, &self.clients[key]);

                    debug!(fd, %addr, clients = self.clients.len(), "Accepted client");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    break;
                }
            }
        }
    }

    fn read(&mut self, key: usize) {
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let client = &mut self.clients[key];
            match client.stream.read(&mut buf) {
                Ok(0) => {
                    self.close(key, "peer closed");
                    return;
                }
                Ok(n) => {
                    client.inbuf.extend_from_slice(&buf[..n]);
                    let taken = take_lines(&mut client.inbuf, &mut client.outbuf, self.max_line);
                    if let Err(overflow) = taken {
                        match overflow {
                            Overflow::Line(len) => debug!(len, "Line too long"),
                            Overflow::Partial(len) => debug!(len, "Unterminated line too long"),
                        }
                        self.close(key, "line too long");
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(error = %e, "Client read failed");
                    self.close(key, "read error");
                    return;
                }
            }
        }

        self.flush(key);
    }

    fn flush(&mut self, key: usize) {
        let client = &mut self.clients[key];
        let fd = client.stream.as_raw_fd();

        while !client.outbuf.is_empty() {
            match client.stream.write(&client.outbuf) {
                Ok(0) => {
                    self.close(key, "write returned zero");
                    return;
                }
                Ok(n) => {
                    client.outbuf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(error = %e, "Client write failed");
                    self.close(key, "write error");
                    return;
                }
            }
        }

        if client.outbuf.is_empty() {
            self.registry.clear_interest(fd, Interest::WRITE);
        } else {
            self.registry.set_interest(fd, Interest::WRITE);
        }
    }

    fn close(&mut self, key: usize, reason: &str) {
        let client = self.clients.remove(key);
        let fd = client.stream.as_raw_fd();
        // Unregister while the descriptor is still open; dropping the client
        // closes it.
        self.registry.unregister(fd);
        debug!(fd, addr = %client.addr, reason, "Closed client");
    }
}

/// Move every complete line from `inbuf` to `outbuf`.
///
/// Fails on the first line longer than `max_line`, or when the unterminated
/// remainder is already longer than that.
fn take_lines(
    inbuf: &mut Vec<u8>,
    outbuf: &mut Vec<u8>,
    max_line: usize,
) -> Result<(), Overflow> {
    while let Some(pos) = inbuf.iter().position(|&b| b == b'\n') {
        if pos > max_line {
            return Err(Overflow::Line(pos));
        }
        outbuf.extend(inbuf.drain(..=pos));
    }

    if inbuf.len() > max_line {
        return Err(Overflow::Partial(inbuf.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_lines_moves_complete_lines() {
        let mut inbuf = b"one\ntwo\nthr".to_vec();
        let mut outbuf = Vec::new();

        assert!(take_lines(&mut inbuf, &mut outbuf, 8).is_ok());
        assert_eq!(outbuf, b"one\ntwo\n");
        assert_eq!(inbuf, b"thr");
    }

    #[test]
    fn test_take_lines_line_at_limit() {
        let mut inbuf = b"12345678\n".to_vec();
        let mut outbuf = Vec::new();

        assert!(take_lines(&mut inbuf, &mut outbuf, 8).is_ok());
        assert_eq!(outbuf, b"12345678\n");
    }

    #[test]
    fn test_take_lines_rejects_long_terminated_line() {
        let mut inbuf = [b'A'; 10_000].to_vec();
        inbuf.push(b'\n');
        let mut outbuf = Vec::new();

        let result = take_lines(&mut inbuf, &mut outbuf, 512);
        assert!(matches!(result, Err(Overflow::Line(10_000))));
        assert!(outbuf.is_empty());
    }

    #[test]
    fn test_take_lines_keeps_earlier_lines_before_long_one() {
        let mut inbuf = b"ok\n0123456789\n".to_vec();
        let mut outbuf = Vec::new();

        let result = take_lines(&mut inbuf, &mut outbuf, 4);
        assert!(matches!(result, Err(Overflow::Line(10))));
        assert_eq!(outbuf, b"ok\n");
    }

    #[test]
    fn test_take_lines_rejects_long_partial_line() {
        let mut inbuf = b"123456789".to_vec();
        let mut outbuf = Vec::new();

        let result = take_lines(&mut inbuf, &mut outbuf, 8);
        assert!(matches!(result, Err(Overflow::Partial(9))));
        assert!(outbuf.is_empty());
    }
}
