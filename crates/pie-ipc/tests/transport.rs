use pie_ipc::{ManagedSocket, TransportError};
use std::time::Duration;

fn ipc_url(dir: &tempfile::TempDir, name: &str) -> String {
    format!("ipc://{}", dir.path().join(name).display())
}

#[test]
fn push_pull_round_trip_over_ipc_socket() {
    let dir = tempfile::tempdir().unwrap();
    let url = ipc_url(&dir, "push-pull.ipc");
    let ctx = zmq::Context::new();
    let puller = ctx.socket(zmq::PULL).unwrap();
    puller.bind(&url).unwrap();

    let pusher = ManagedSocket::dial(&ctx, "request", zmq::PUSH, &url, 10, Duration::from_millis(10)).unwrap();
    pusher.send(b"hello").unwrap();

    let received = puller.recv_bytes(0).unwrap();
    assert_eq!(received, b"hello");
}

#[test]
fn receive_without_a_peer_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let url = ipc_url(&dir, "waiter.ipc");
    let ctx = zmq::Context::new();
    let binder = ctx.socket(zmq::PULL).unwrap();
    binder.bind(&url).unwrap();

    let managed = ManagedSocket::dial(&ctx, "response", zmq::PULL, &url, 10, Duration::from_millis(10)).unwrap();
    let err = managed.receive(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, TransportError::Timeout));
}

#[test]
fn dial_fails_after_exhausting_retry_budget_on_malformed_endpoint() {
    // zmq's ipc/tcp transports connect lazily in the background and do not
    // surface a missing socket file synchronously, so the one endpoint shape
    // `connect()` rejects immediately is a malformed transport scheme.
    let ctx = zmq::Context::new();
    let err = ManagedSocket::dial(&ctx, "management", zmq::REQ, "bogus://nowhere", 2, Duration::from_millis(1))
        .unwrap_err();
    assert!(matches!(err, TransportError::DialFailed { attempts: 2, .. }));
}
