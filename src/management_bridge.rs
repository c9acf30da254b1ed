//! Bridges `pie_registry::ManagementTransport` to the real management
//! socket, so `pie-registry` never needs to depend on `pie-ipc` directly.

use pie_ipc::IpcSockets;
use pie_protocol::{LoadModelReply, LoadModelRequest};
use pie_registry::{ManagementTransport, RegistryError};
use std::sync::Arc;
use std::time::Duration;

pub struct ManagementBridge {
    sockets: Arc<IpcSockets>,
    timeout: Duration,
}

impl ManagementBridge {
    pub fn new(sockets: Arc<IpcSockets>, timeout: Duration) -> Self {
        ManagementBridge { sockets, timeout }
    }
}

impl ManagementTransport for ManagementBridge {
    async fn send_load_model(&self, request: &LoadModelRequest) -> Result<LoadModelReply, RegistryError> {
        let body = serde_json::to_vec(request).map_err(|err| RegistryError::Transport(err.to_string()))?;
        let sockets = self.sockets.clone();
        let timeout = self.timeout;
        let reply_bytes = tokio::task::spawn_blocking(move || sockets.management.request(&body, timeout))
            .await
            .map_err(|err| RegistryError::Transport(err.to_string()))?
            .map_err(|err| RegistryError::Transport(err.to_string()))?;
        serde_json::from_slice(&reply_bytes).map_err(|err| RegistryError::Transport(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_ipc::IpcEndpoints;
    use pie_protocol::LoadModelStatus;
    use pie_test_utils::FakeEngine;

    #[tokio::test]
    async fn sends_json_request_and_parses_ok_reply() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeEngine::bind(dir.path());
        let endpoints = IpcEndpoints::under_ipc_dir(dir.path());
        let sockets = Arc::new(IpcSockets::connect(&endpoints, 1, 20, Duration::from_millis(20)).unwrap());
        let bridge = ManagementBridge::new(sockets, Duration::from_secs(5));

        let handle = std::thread::spawn(move || {
            let bytes = fake.recv_management(Duration::from_secs(2)).expect("request arrives");
            let request: LoadModelRequest = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(request.canonical_id, "llama-3");
            fake.reply_management(&serde_json::json!({"status": "ok"}));
        });

        let request = LoadModelRequest {
            requested_id: "llama-3".to_owned(),
            canonical_id: "llama-3".to_owned(),
            model_path: "/models/llama-3".to_owned(),
            wait_for_completion: false,
        };
        let reply = bridge.send_load_model(&request).await.unwrap();
        assert_eq!(reply.status, LoadModelStatus::Ok);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn management_timeout_surfaces_as_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let _fake = FakeEngine::bind(dir.path());
        let endpoints = IpcEndpoints::under_ipc_dir(dir.path());
        let sockets = Arc::new(IpcSockets::connect(&endpoints, 1, 20, Duration::from_millis(20)).unwrap());
        let bridge = ManagementBridge::new(sockets, Duration::from_millis(50));

        let request = LoadModelRequest {
            requested_id: "llama-3".to_owned(),
            canonical_id: "llama-3".to_owned(),
            model_path: "/models/llama-3".to_owned(),
            wait_for_completion: false,
        };
        let err = bridge.send_load_model(&request).await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
    }
}
