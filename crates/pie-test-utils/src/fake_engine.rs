//! A fake engine: binds the three IPC sockets an engine subprocess would
//! create, for driving client-side transport and receive-loop tests
//! without a real subprocess.

use pie_ipc::IpcEndpoints;
use pie_protocol::event_topic;
use std::path::Path;
use std::time::Duration;

/// Binds `request` (PULL), `response` (PUB), and `management` (REP) at the
/// standard socket file names under `ipc_dir`. The client side dials these
/// with `PUSH`/`SUB`/`REQ` respectively.
pub struct FakeEngine {
    _ctx: zmq::Context,
    pub request: zmq::Socket,
    pub response: zmq::Socket,
    pub management: zmq::Socket,
}

impl FakeEngine {
    pub fn bind(ipc_dir: &Path) -> Self {
        std::fs::create_dir_all(ipc_dir).expect("create ipc dir");
        let endpoints = IpcEndpoints::under_ipc_dir(ipc_dir);
        let ctx = zmq::Context::new();

        let request = ctx.socket(zmq::PULL).expect("create request socket");
        request.bind(&endpoints.request_url).expect("bind request socket");

        let response = ctx.socket(zmq::PUB).expect("create response socket");
        response.bind(&endpoints.response_url).expect("bind response socket");

        let management = ctx.socket(zmq::REP).expect("create management socket");
        management.bind(&endpoints.management_url).expect("bind management socket");

        FakeEngine { _ctx: ctx, request, response, management }
    }

    /// Receives the next request frame, or `None` after `timeout`.
    pub fn recv_request(&self, timeout: Duration) -> Option<Vec<u8>> {
        recv_with_timeout(&self.request, timeout)
    }

    /// Receives the next management request frame, or `None` after `timeout`.
    pub fn recv_management(&self, timeout: Duration) -> Option<Vec<u8>> {
        recv_with_timeout(&self.management, timeout)
    }

    /// Replies to a pending management request (must be called after
    /// [`FakeEngine::recv_management`] returns `Some`).
    pub fn reply_management(&self, body: &serde_json::Value) {
        self.management.send(body.to_string().as_bytes(), 0).expect("send management reply");
    }

    /// Publishes a frame prefixed with the given topic, matching the wire
    /// convention the response socket uses for per-channel delta routing.
    pub fn publish_with_topic(&self, topic: &str, payload: &[u8]) {
        let mut frame = topic.as_bytes().to_vec();
        frame.extend_from_slice(payload);
        self.response.send(frame, 0).expect("publish frame");
    }

    /// Publishes a broadcast event: `__PIE_EVENT__:<name>\0<json>`.
    pub fn publish_event(&self, name: &str, body: &serde_json::Value) {
        let mut frame = event_topic(name).into_bytes();
        frame.extend_from_slice(body.to_string().as_bytes());
        self.response.send(frame, 0).expect("publish event");
    }

    /// Publishes a `telemetry` event carrying `health.pid`, as the lease
    /// manager's readiness wait expects.
    pub fn publish_ready(&self, pid: u32) {
        self.publish_event("telemetry", &serde_json::json!({"health": {"pid": pid}}));
    }
}

fn recv_with_timeout(socket: &zmq::Socket, timeout: Duration) -> Option<Vec<u8>> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    socket.set_rcvtimeo(millis).expect("set rcvtimeo");
    match socket.recv_bytes(0) {
        Ok(bytes) => Some(bytes),
        Err(zmq::Error::EAGAIN) => None,
        Err(e) => panic!("unexpected recv error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_ipc::ManagedSocket;

    #[test]
    fn request_frame_sent_by_a_managed_push_socket_is_observed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::bind(dir.path());

        let ctx = zmq::Context::new();
        let endpoints = IpcEndpoints::under_ipc_dir(dir.path());
        let push = ManagedSocket::dial(&ctx, "request", zmq::PUSH, &endpoints.request_url, 20, Duration::from_millis(20)).unwrap();
        push.send(b"hello-engine").unwrap();

        let frame = engine.recv_request(Duration::from_secs(1)).unwrap();
        assert_eq!(frame, b"hello-engine");
    }

    #[test]
    fn recv_request_times_out_with_no_sender() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine::bind(dir.path());
        assert!(engine.recv_request(Duration::from_millis(50)).is_none());
    }
}
