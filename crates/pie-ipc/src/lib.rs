//! The three-socket IPC transport to the engine subprocess: request fan-in,
//! response fan-out, and synchronous management, all over ZeroMQ unix-domain
//! transports.

mod channel;
mod error;
mod socket;

pub use channel::generate_response_channel_id;
pub use error::TransportError;
pub use socket::ManagedSocket;

use pie_protocol::EVENT_PREFIX;
use std::path::Path;
use std::time::Duration;

/// Unix-domain socket file name, client → engine request fan-in.
pub const REQUEST_SOCKET_FILE: &str = "pie_requests.ipc";
/// Unix-domain socket file name, engine → client response fan-out.
pub const RESPONSE_SOCKET_FILE: &str = "pie_responses.ipc";
/// Unix-domain socket file name, client ↔ engine synchronous management.
pub const MANAGEMENT_SOCKET_FILE: &str = "pie_management.ipc";

/// Default bounded-retry dial parameters.
pub const DEFAULT_DIAL_ATTEMPTS: u32 = 50;
pub const DEFAULT_DIAL_DELAY: Duration = Duration::from_millis(200);
/// Default receive-loop poll timeout.
pub const RECEIVE_LOOP_TIMEOUT: Duration = Duration::from_millis(100);
/// Default per-call management command timeout.
pub const DEFAULT_MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// The `ipc://` dial URLs for the three sockets, rooted under a shared
/// cache directory's `ipc/` subdirectory.
#[derive(Debug, Clone)]
pub struct IpcEndpoints {
    pub request_url: String,
    pub response_url: String,
    pub management_url: String,
}

impl IpcEndpoints {
    pub fn under_ipc_dir(ipc_dir: &Path) -> Self {
        let url_for = |file: &str| format!("ipc://{}", ipc_dir.join(file).display());
        IpcEndpoints {
            request_url: url_for(REQUEST_SOCKET_FILE),
            response_url: url_for(RESPONSE_SOCKET_FILE),
            management_url: url_for(MANAGEMENT_SOCKET_FILE),
        }
    }
}

/// The connected three-socket bundle. Owns the zmq context so sockets
/// outlive any caller-held borrows.
pub struct IpcSockets {
    _ctx: zmq::Context,
    pub request: ManagedSocket,
    pub response: ManagedSocket,
    pub management: ManagedSocket,
}

impl IpcSockets {
    /// Connect all three sockets. The response socket subscribes to the
    /// per-channel topic and the broadcast event prefix before dialling, so
    /// no early message is missed.
    pub fn connect(
        endpoints: &IpcEndpoints,
        response_channel_id: u64,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, TransportError> {
        let ctx = zmq::Context::new();
        let request = ManagedSocket::dial(&ctx, "request", zmq::PUSH, &endpoints.request_url, attempts, delay)?;
        let topic = pie_protocol::response_topic(response_channel_id);
        let topics: [&[u8]; 2] = [topic.as_bytes(), EVENT_PREFIX.as_bytes()];
        let response = ManagedSocket::subscribe_before_dial(
            &ctx,
            "response",
            &endpoints.response_url,
            &topics,
            attempts,
            delay,
        )?;
        let management =
            ManagedSocket::dial(&ctx, "management", zmq::REQ, &endpoints.management_url, attempts, delay)?;
        Ok(IpcSockets { _ctx: ctx, request, response, management })
    }

    /// Idempotent: closes each socket, ignoring sockets already closed.
    pub fn close(&self) {
        self.request.close();
        self.response.close();
        self.management.close();
    }
}
