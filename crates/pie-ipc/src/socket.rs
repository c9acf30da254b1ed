//! A single zmq socket wrapped for thread-safe, timeout-bounded use.
//!
//! Exposes `dial`, `receive(timeout)`, and idempotent `close`, all safe to
//! call concurrently. Blocking zmq calls happen behind
//! `parking_lot::Mutex`; callers on the async facade wrap calls in
//! `tokio::task::spawn_blocking`.

use crate::error::TransportError;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// A named, thread-safe zmq socket with bounded-retry dialling.
pub struct ManagedSocket {
    name: &'static str,
    socket: Mutex<Option<zmq::Socket>>,
}

impl ManagedSocket {
    fn from_connected(name: &'static str, socket: zmq::Socket) -> Self {
        ManagedSocket { name, socket: Mutex::new(Some(socket)) }
    }

    /// Open a socket of `kind` and connect it to `url`, retrying up to
    /// `attempts` times with `delay` between attempts (the default is 50
    /// attempts at 200 ms, since the engine may not have created the
    /// socket file yet).
    pub fn dial(
        ctx: &zmq::Context,
        name: &'static str,
        kind: zmq::SocketType,
        url: &str,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, TransportError> {
        let socket = ctx.socket(kind).map_err(|e| TransportError::Context(e.to_string()))?;
        let mut last_err = String::new();
        for attempt in 1..=attempts.max(1) {
            match socket.connect(url) {
                Ok(()) => {
                    debug!(socket = name, url, attempt, "dialled");
                    return Ok(ManagedSocket::from_connected(name, socket));
                }
                Err(e) => {
                    last_err = e.to_string();
                    if attempt < attempts {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
        Err(TransportError::DialFailed { url: url.to_owned(), attempts, message: last_err })
    }

    /// Subscribe a SUB socket to each topic in `topics` before it is
    /// connected, so no message published right after connect is missed.
    pub fn subscribe_before_dial(
        ctx: &zmq::Context,
        name: &'static str,
        url: &str,
        topics: &[&[u8]],
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, TransportError> {
        let socket = ctx.socket(zmq::SUB).map_err(|e| TransportError::Context(e.to_string()))?;
        for topic in topics {
            socket
                .set_subscribe(topic)
                .map_err(|e| TransportError::Context(format!("subscribe failed: {e}")))?;
        }
        let mut last_err = String::new();
        for attempt in 1..=attempts.max(1) {
            match socket.connect(url) {
                Ok(()) => {
                    debug!(socket = name, url, attempt, "dialled (sub)");
                    return Ok(ManagedSocket::from_connected(name, socket));
                }
                Err(e) => {
                    last_err = e.to_string();
                    if attempt < attempts {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
        Err(TransportError::DialFailed { url: url.to_owned(), attempts, message: last_err })
    }

    /// Send a single-frame message. Fails with [`TransportError::Closed`]
    /// after `close` has been called.
    pub fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let guard = self.socket.lock();
        let socket = guard.as_ref().ok_or(TransportError::Closed)?;
        socket
            .send(bytes, 0)
            .map_err(|e| TransportError::Send { socket: self.name, message: e.to_string() })
    }

    /// Block for at most `timeout`, returning the next frame's bytes or
    /// [`TransportError::Timeout`].
    pub fn receive(&self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let guard = self.socket.lock();
        let socket = guard.as_ref().ok_or(TransportError::Closed)?;
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        socket
            .set_rcvtimeo(millis)
            .map_err(|e| TransportError::Receive { socket: self.name, message: e.to_string() })?;
        match socket.recv_bytes(0) {
            Ok(bytes) => Ok(bytes),
            Err(zmq::Error::EAGAIN) => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Receive { socket: self.name, message: e.to_string() }),
        }
    }

    /// A synchronous request/reply round trip: send then block for a reply.
    /// Used by the management socket, which allows exactly one outstanding
    /// call.
    pub fn request(&self, bytes: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let guard = self.socket.lock();
        let socket = guard.as_ref().ok_or(TransportError::Closed)?;
        socket
            .send(bytes, 0)
            .map_err(|e| TransportError::Send { socket: self.name, message: e.to_string() })?;
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        socket
            .set_rcvtimeo(millis)
            .map_err(|e| TransportError::Receive { socket: self.name, message: e.to_string() })?;
        match socket.recv_bytes(0) {
            Ok(bytes) => Ok(bytes),
            Err(zmq::Error::EAGAIN) => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Receive { socket: self.name, message: e.to_string() }),
        }
    }

    /// Idempotent close: subsequent calls are no-ops. Drops the underlying
    /// zmq socket, which closes its file descriptor.
    pub fn close(&self) {
        let mut guard = self.socket.lock();
        if guard.take().is_some() {
            debug!(socket = self.name, "closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.socket.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let ctx = zmq::Context::new();
        let raw = ctx.socket(zmq::PUSH).unwrap();
        let socket = ManagedSocket::from_connected("test", raw);
        assert!(!socket.is_closed());
        socket.close();
        socket.close();
        assert!(socket.is_closed());
    }

    #[test]
    fn operations_after_close_fail_with_closed() {
        let ctx = zmq::Context::new();
        let raw = ctx.socket(zmq::PUSH).unwrap();
        let socket = ManagedSocket::from_connected("test", raw);
        socket.close();
        assert!(matches!(socket.send(b"hi"), Err(TransportError::Closed)));
        assert!(matches!(socket.receive(Duration::from_millis(1)), Err(TransportError::Closed)));
    }
}
