//! The high-level chat facade: `chat`, `chat_stream`, `chat_batch`.

use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::ClientError;
use crate::response::{self, ClientResponse};
use pie_formatter::Interaction;
use pie_protocol::{ChatParameters, ClientDelta, FrameRequest, RequestType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A host application's handle onto the shared engine. Cheap to clone
/// (wraps an `Arc`), and safe to hold from multiple tasks concurrently.
pub struct Client {
    context: Arc<Context>,
    default_model: Option<String>,
    closed: AtomicBool,
}

impl Client {
    /// Starts (or attaches to) the shared engine and connects this
    /// process's IPC sockets.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let context = Context::acquire(&config)?;
        Ok(Client { context, default_model: None, closed: AtomicBool::new(false) })
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// One conversation in, one aggregated response out.
    pub async fn chat(
        &self,
        model: Option<&str>,
        conversation: &[Interaction],
        parameters: ChatParameters,
    ) -> Result<ClientResponse, ClientError> {
        let (mut rx, _request_id) = self.submit(model, std::slice::from_ref(&conversation.to_vec()), parameters).await?;
        let mut deltas = Vec::new();
        while let Some(delta) = rx.recv().await {
            let is_final = delta.is_final;
            deltas.push(delta);
            if is_final {
                break;
            }
        }
        Ok(response::aggregate(deltas))
    }

    /// Forwards each delta to the caller as it arrives; the returned
    /// receiver ends when `is_final` is seen.
    pub async fn chat_stream(
        &self,
        model: Option<&str>,
        conversation: &[Interaction],
        parameters: ChatParameters,
    ) -> Result<mpsc::UnboundedReceiver<ClientDelta>, ClientError> {
        let (rx, _request_id) = self.submit(model, std::slice::from_ref(&conversation.to_vec()), parameters).await?;
        Ok(rx)
    }

    /// `N` prompts in one request frame, deltas grouped by `prompt_index`;
    /// the returned sequence has length `N` even if a group is empty.
    pub async fn chat_batch(
        &self,
        model: Option<&str>,
        conversations: &[Vec<Interaction>],
        parameters: ChatParameters,
    ) -> Result<Vec<ClientResponse>, ClientError> {
        let n = conversations.len();
        let (mut rx, _request_id) = self.submit(model, conversations, parameters).await?;

        let mut groups: Vec<Vec<ClientDelta>> = vec![Vec::new(); n];
        let mut finished = vec![false; n];
        while let Some(delta) = rx.recv().await {
            let index = delta.prompt_index.unwrap_or(0) as usize;
            let is_final = delta.is_final;
            if let Some(group) = groups.get_mut(index) {
                group.push(delta);
            }
            if let Some(slot) = finished.get_mut(index) {
                *slot = is_final;
            }
            if finished.iter().all(|&done| done) {
                break;
            }
        }
        Ok(groups.into_iter().map(response::aggregate).collect())
    }

    /// Idempotent: releases this client's hold on the shared IPC sockets.
    /// Does not stop the engine — that happens when the last `Context` in
    /// the process is dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    async fn submit(
        &self,
        model: Option<&str>,
        conversations: &[Vec<Interaction>],
        parameters: ChatParameters,
    ) -> Result<(mpsc::UnboundedReceiver<ClientDelta>, u64), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let model_id =
            model.map(str::to_owned).or_else(|| self.default_model.clone()).ok_or(ClientError::NoModelSpecified)?;

        let info = self.context.registry.ensure_loaded(&model_id).await?;

        let mut prompts = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let blobs =
                pie_formatter::format_prompt(&info.formatter, conversation, None, true, true, parameters.clone())?;
            prompts.push(blobs);
        }

        let request_id = self.context.ipc.next_request_id();
        let response_channel_id = self.context.ipc.response_channel_id();
        let frame_request = FrameRequest {
            request_id,
            model_id: info.canonical_id.clone(),
            model_path: info.model_path.to_string_lossy().into_owned(),
            request_type: RequestType::Generation,
            request_channel_id: request_id,
            response_channel_id,
            prompts,
        };
        let frame = pie_protocol::build_frame(&frame_request)?;
        let rx = self.context.ipc.send_request(frame, request_id).await?;
        Ok((rx, request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_formatter::conversation::Content;
    use pie_test_utils::FakeEngine;
    use std::time::Duration;

    fn text_conversation(text: &str) -> Vec<Interaction> {
        vec![Interaction { role: Some("user".to_owned()), content: Content::Text(text.to_owned()) }]
    }

    fn write_model(cache_root: &std::path::Path, model_id: &str) -> std::path::PathBuf {
        let model_dir = cache_root.join("models").join(model_id);
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(
            model_dir.join("config.json"),
            serde_json::json!({
                "template_type": "generic",
                "begin_of_text": "<|bot|>",
                "end_of_message": "<|eom|>",
                "end_of_sequence": "<|eos|>",
                "roles": {
                    "user": {"role_name": "user", "role_start_tag": "<|u|>", "role_end_tag": "<|/u|>"}
                }
            })
            .to_string(),
        )
        .unwrap();
        model_dir
    }

    fn connect_client(dir: &std::path::Path) -> (FakeEngine, Client) {
        let cache_root = dir.join("cache");
        std::fs::create_dir_all(&cache_root).unwrap();
        write_model(&cache_root, "test-model");
        let ipc_dir = pie_lease::cache_dir::ipc_dir(&cache_root);
        let fake = FakeEngine::bind(&ipc_dir);

        let mut dummy_engine = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        std::fs::write(cache_root.join("engine.pid"), dummy_engine.id().to_string()).unwrap();
        std::fs::write(cache_root.join("engine.ready"), "1").unwrap();
        // Detached reaper, same pattern as `engine::spawn`'s own, since this
        // child was not spawned through it.
        std::thread::spawn(move || {
            let _ = dummy_engine.wait();
        });

        let mut config = ClientConfig::new(std::path::PathBuf::from("/bin/true"));
        config.cache_root = Some(cache_root);
        config.dial_attempts = 20;
        config.dial_delay = Duration::from_millis(20);

        let context = Context::connect_standalone(&config).unwrap();
        let client = Client { context: Arc::new(context), default_model: None, closed: AtomicBool::new(false) };
        (fake, client)
    }

    #[tokio::test]
    async fn chat_aggregates_deltas_from_a_fake_engine() {
        let dir = tempfile::tempdir().unwrap();
        let (fake, client) = connect_client(dir.path());
        let response_channel_id = client.context.ipc.response_channel_id();

        // The fake engine never receives a load_model management call here:
        // the model resolves to a local on-disk config, which activates
        // immediately without contacting the engine.
        let responder = tokio::task::spawn_blocking(move || {
            let _request_frame = fake.recv_request(Duration::from_secs(2)).expect("request sent");
            let topic = pie_protocol::response_topic(response_channel_id);
            fake.publish_with_topic(&topic, br#"{"request_id":1,"content":"Hi","is_final_delta":true,"finish_reason":"stop"}"#);
        });

        let conversation = text_conversation("hello");
        let (response, responder_result) = tokio::join!(
            client.chat(Some("test-model"), &conversation, ChatParameters::default()),
            responder
        );
        responder_result.unwrap();
        let response = response.unwrap();
        assert_eq!(response.text, "Hi");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn chat_without_a_model_or_default_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_fake, client) = connect_client(dir.path());
        let err = client.chat(None, &text_conversation("hello"), ChatParameters::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::NoModelSpecified));
    }

    #[tokio::test]
    async fn closed_client_rejects_new_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (_fake, client) = connect_client(dir.path());
        client.close();
        let err = client.chat(Some("test-model"), &text_conversation("hello"), ChatParameters::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
