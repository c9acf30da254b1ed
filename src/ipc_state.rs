//! Owns the three IPC sockets, the response channel id, the request-id
//! counter, and the per-request delta sinks; runs the dedicated receive
//! loop that dispatches deltas and broadcast events as they arrive.

use parking_lot::Mutex;
use pie_ipc::{IpcEndpoints, IpcSockets, TransportError, RECEIVE_LOOP_TIMEOUT};
use pie_protocol::{parse_event_body, ClientDelta, ModelLoadedEvent, Telemetry, EVENT_PREFIX};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// A non-owning back reference the receive loop uses to complete model
/// activation on a `model_loaded` broadcast event, so the receive loop can
/// notify the registry without owning it.
pub trait ModelEventSink: Send + Sync {
    fn handle_model_loaded(&self, model_id: &str, capabilities: HashMap<String, Vec<i64>>);
}

type SinkMap = Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<ClientDelta>>>>;

pub struct IpcState {
    sockets: Arc<IpcSockets>,
    response_channel_id: u64,
    next_request_id: AtomicU64,
    sinks: SinkMap,
    stop: Arc<AtomicBool>,
    receiver: Mutex<Option<std::thread::JoinHandle<()>>>,
    last_telemetry: Arc<Mutex<Option<Telemetry>>>,
}

impl IpcState {
    /// Takes ownership of already-connected sockets and starts the
    /// background receiver. Connection itself is the caller's job
    /// (`Context::acquire`), since the same sockets are also shared with a
    /// [`crate::management_bridge::ManagementBridge`].
    pub fn new(sockets: Arc<IpcSockets>, response_channel_id: u64, model_events: Weak<dyn ModelEventSink>) -> Self {
        let sinks: SinkMap = Arc::new(Mutex::new(HashMap::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let last_telemetry = Arc::new(Mutex::new(None));

        let handle = std::thread::spawn({
            let sockets = sockets.clone();
            let sinks = sinks.clone();
            let stop = stop.clone();
            let last_telemetry = last_telemetry.clone();
            move || receiver_loop(sockets, response_channel_id, sinks, stop, model_events, last_telemetry)
        });

        IpcState {
            sockets,
            response_channel_id,
            next_request_id: AtomicU64::new(0),
            sinks,
            stop,
            receiver: Mutex::new(Some(handle)),
            last_telemetry,
        }
    }

    /// Connects all three sockets and wraps them, for callers (tests) that
    /// do not need to share the socket bundle with anything else.
    pub fn connect(
        endpoints: &IpcEndpoints,
        model_events: Weak<dyn ModelEventSink>,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, TransportError> {
        let response_channel_id = pie_ipc::generate_response_channel_id();
        let sockets = Arc::new(IpcSockets::connect(endpoints, response_channel_id, attempts, delay)?);
        Ok(IpcState::new(sockets, response_channel_id, model_events))
    }

    pub fn response_channel_id(&self) -> u64 {
        self.response_channel_id
    }

    /// Allocates the next request id: strictly increasing, nonzero, wraps
    /// past `u64::MAX` back to 1.
    pub fn next_request_id(&self) -> u64 {
        let mut current = self.next_request_id.load(Ordering::SeqCst);
        loop {
            let next = if current == u64::MAX { 1 } else { current + 1 };
            match self.next_request_id.compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Registers a delta sink for `request_id`, then pushes `frame` on the
    /// request socket. On send failure the sink is unregistered before the
    /// error is returned, so a failed push never leaves a dangling sink.
    pub async fn send_request(
        &self,
        frame: Vec<u8>,
        request_id: u64,
    ) -> Result<mpsc::UnboundedReceiver<ClientDelta>, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sinks.lock().insert(request_id, tx);

        let sockets = self.sockets.clone();
        let send_result = tokio::task::spawn_blocking(move || sockets.request.send(&frame))
            .await
            .expect("request-send task panicked");
        if let Err(err) = send_result {
            self.sinks.lock().remove(&request_id);
            return Err(err);
        }
        Ok(rx)
    }

    pub fn last_telemetry(&self) -> Option<Telemetry> {
        self.last_telemetry.lock().clone()
    }

    /// Idempotent: sets the stop flag, joins the receiver thread, and closes
    /// the sockets.
    pub fn close(&self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.receiver.lock().take() {
            let _ = handle.join();
        }
        self.sockets.close();
    }
}

impl Drop for IpcState {
    fn drop(&mut self) {
        self.close();
    }
}

fn receiver_loop(
    sockets: Arc<IpcSockets>,
    response_channel_id: u64,
    sinks: SinkMap,
    stop: Arc<AtomicBool>,
    model_events: Weak<dyn ModelEventSink>,
    last_telemetry: Arc<Mutex<Option<Telemetry>>>,
) {
    let topic = pie_protocol::response_topic(response_channel_id).into_bytes();
    while !stop.load(Ordering::SeqCst) {
        match sockets.response.receive(RECEIVE_LOOP_TIMEOUT) {
            Ok(frame) => dispatch_frame(&frame, &topic, &sinks, &model_events, &last_telemetry),
            Err(TransportError::Timeout) => continue,
            Err(TransportError::Closed) => break,
            Err(err) => {
                warn!(error = %err, "response socket receive failed; continuing");
                continue;
            }
        }
    }
    // Finish any remaining sinks: dropping the senders ends every caller's
    // stream/collection loop.
    sinks.lock().clear();
}

fn dispatch_frame(
    frame: &[u8],
    topic: &[u8],
    sinks: &SinkMap,
    model_events: &Weak<dyn ModelEventSink>,
    last_telemetry: &Mutex<Option<Telemetry>>,
) {
    if let Some(body) = frame.strip_prefix(topic) {
        match serde_json::from_slice::<ClientDelta>(body) {
            Ok(delta) => route_delta(delta, sinks),
            Err(err) => warn!(error = %err, "malformed delta frame dropped"),
        }
        return;
    }
    if let Some(after_prefix) = frame.strip_prefix(EVENT_PREFIX.as_bytes()) {
        match parse_event_body(after_prefix) {
            Some(event) => dispatch_event(event, model_events, last_telemetry),
            None => warn!("event frame without NUL separator dropped"),
        }
        return;
    }
    trace!("frame matched neither this channel's topic nor the event prefix; dropped");
}

fn route_delta(delta: ClientDelta, sinks: &SinkMap) {
    let request_id = delta.request_id;
    let is_final = delta.is_final;
    let mut guard = sinks.lock();
    let Some(sink) = guard.get(&request_id) else {
        trace!(request_id, "no sink registered for delta; dropped");
        return;
    };
    // A send failure means the caller already dropped its receiver
    // (cancellation); either way, the entry is done.
    if sink.send(delta).is_err() || is_final {
        guard.remove(&request_id);
    }
}

fn dispatch_event(
    event: pie_protocol::ManagementEvent,
    model_events: &Weak<dyn ModelEventSink>,
    last_telemetry: &Mutex<Option<Telemetry>>,
) {
    match event.name.as_str() {
        "telemetry" => match serde_json::from_value::<Telemetry>(event.body) {
            Ok(telemetry) => *last_telemetry.lock() = Some(telemetry),
            Err(err) => warn!(error = %err, "malformed telemetry event dropped"),
        },
        "model_loaded" => match serde_json::from_value::<ModelLoadedEvent>(event.body) {
            Ok(loaded) => {
                if let Some(sink) = model_events.upgrade() {
                    sink.handle_model_loaded(&loaded.model_id, loaded.capabilities);
                }
            }
            Err(err) => warn!(error = %err, "malformed model_loaded event dropped"),
        },
        other => trace!(event = other, "unknown broadcast event ignored"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_test_utils::FakeEngine;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        calls: StdMutex<Vec<(String, HashMap<String, Vec<i64>>)>>,
    }

    impl ModelEventSink for RecordingSink {
        fn handle_model_loaded(&self, model_id: &str, capabilities: HashMap<String, Vec<i64>>) {
            self.calls.lock().unwrap().push((model_id.to_owned(), capabilities));
        }
    }

    fn connect_pair(dir: &std::path::Path) -> (FakeEngine, IpcState, Arc<RecordingSink>) {
        let fake = FakeEngine::bind(dir);
        let sink = Arc::new(RecordingSink { calls: StdMutex::new(Vec::new()) });
        let weak: Weak<dyn ModelEventSink> = Arc::downgrade(&sink) as Weak<dyn ModelEventSink>;
        let endpoints = IpcEndpoints::under_ipc_dir(dir);
        let state = IpcState::connect(&endpoints, weak, 20, Duration::from_millis(20)).unwrap();
        (fake, state, sink)
    }

    #[test]
    fn request_ids_are_strictly_increasing_and_skip_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (_fake, state, _sink) = connect_pair(dir.path());
        assert_eq!(state.next_request_id(), 1);
        assert_eq!(state.next_request_id(), 2);
        state.next_request_id.store(u64::MAX, Ordering::SeqCst);
        assert_eq!(state.next_request_id(), 1);
    }

    #[tokio::test]
    async fn delta_for_registered_request_id_reaches_its_sink() {
        let dir = tempfile::tempdir().unwrap();
        let (fake, state, _sink) = connect_pair(dir.path());

        let mut rx = state.send_request(b"ignored-by-fake".to_vec(), 7).await.unwrap();
        // Drain the PULL side so the fake engine's test doesn't need to care.
        let _ = fake.recv_request(Duration::from_millis(200));

        let topic = pie_protocol::response_topic(state.response_channel_id());
        let delta = serde_json::json!({"request_id": 7, "content": "hi", "is_final_delta": true});
        fake.publish_with_topic(&topic, delta.to_string().as_bytes());

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(received.request_id, 7);
        assert_eq!(received.content.as_deref(), Some("hi"));
        assert!(rx.recv().await.is_none(), "sink should be finished after is_final");
    }

    #[tokio::test]
    async fn model_loaded_event_reaches_the_registered_sink() {
        let dir = tempfile::tempdir().unwrap();
        let (fake, state, sink) = connect_pair(dir.path());
        let _ = &state;

        fake.publish_event("model_loaded", &serde_json::json!({"model_id": "llama-3", "capabilities": {}}));

        for _ in 0..50 {
            if !sink.calls.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llama-3");
    }

    #[tokio::test]
    async fn dropping_the_receiver_causes_a_later_delta_to_be_discarded_silently() {
        let dir = tempfile::tempdir().unwrap();
        let (fake, state, _sink) = connect_pair(dir.path());

        let rx = state.send_request(b"ignored".to_vec(), 9).await.unwrap();
        let _ = fake.recv_request(Duration::from_millis(200));
        drop(rx);

        let topic = pie_protocol::response_topic(state.response_channel_id());
        let delta = serde_json::json!({"request_id": 9, "content": "too late"});
        fake.publish_with_topic(&topic, delta.to_string().as_bytes());

        // No panic, no observable effect; give the loop a moment to process
        // (and drop the now-dead sink) before the test ends.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
