use thiserror::Error;

/// Transport-level error kind, with `Timeout` as the distinguished
/// sub-kind callers branch on most often.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to dial {url} after {attempts} attempts: {message}")]
    DialFailed { url: String, attempts: u32, message: String },
    #[error("receive timed out")]
    Timeout,
    #[error("send on {socket} failed: {message}")]
    Send { socket: &'static str, message: String },
    #[error("receive on {socket} failed: {message}")]
    Receive { socket: &'static str, message: String },
    #[error("socket already closed")]
    Closed,
    #[error("failed to create zmq context: {0}")]
    Context(String),
}
