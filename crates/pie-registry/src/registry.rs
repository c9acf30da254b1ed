//! The model registry: resolves identifiers, owns the load state machine,
//! and drives activation through a caller-supplied management transport.

use crate::entry::{ActivationWaiter, ModelEntry, ModelInfo, ModelState};
use crate::error::RegistryError;
use crate::resolver::{ModelSource, Resolver};
use parking_lot::Mutex;
use pie_protocol::{LoadModelReply, LoadModelRequest, LoadModelStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Sends the management-socket `load_model` command. Defined here so that
/// `pie-registry` never depends on the IPC transport crate; the root crate
/// wires a concrete implementation backed by the real management socket.
pub trait ManagementTransport: Send + Sync {
    fn send_load_model(
        &self,
        request: &LoadModelRequest,
    ) -> impl std::future::Future<Output = Result<LoadModelReply, RegistryError>> + Send;
}

pub struct Registry<T: ManagementTransport> {
    resolver: Resolver,
    entries: Mutex<HashMap<String, ModelEntry>>,
    transport: T,
}

impl<T: ManagementTransport> Registry<T> {
    pub fn new(resolver: Resolver, transport: T) -> Self {
        Registry { resolver, entries: Mutex::new(HashMap::new()), transport }
    }

    /// `scheduleModelSync`: resolves the id, then advances or leaves the
    /// entry's state without contacting the engine.
    pub fn schedule_model_sync(&self, identifier: &str, force_reload: bool) -> Result<(ModelState, String), RegistryError> {
        let resolved = self.resolver.resolve(identifier)?;
        let canonical_id = resolved.canonical_id.clone();

        let mut entries = self.entries.lock();
        let entry = entries.entry(canonical_id.clone()).or_insert_with(ModelEntry::idle);

        if entry.state == ModelState::Ready && !force_reload {
            return Ok((ModelState::Ready, canonical_id));
        }
        if matches!(entry.state, ModelState::Loading | ModelState::Downloading | ModelState::Activating) && !force_reload {
            return Ok((entry.state, canonical_id));
        }

        match resolved.source {
            ModelSource::Local | ModelSource::HfCache => match load_formatter(&resolved.model_path) {
                Ok(formatter) => {
                    let model_path = resolved.model_path.clone();
                    entry.reset_for_load(resolved);
                    entry.info = Some(Arc::new(ModelInfo {
                        canonical_id: canonical_id.clone(),
                        model_path,
                        formatter: Arc::new(formatter),
                        capabilities: HashMap::new(),
                    }));
                    info!(model_id = %canonical_id, "scheduled model load");
                    Ok((ModelState::Loading, canonical_id))
                }
                Err(err) => {
                    entry.fail(err.to_string());
                    Err(err)
                }
            },
            ModelSource::Remote => {
                entry.fail(format!("{canonical_id} is not cached locally"));
                warn!(model_id = %canonical_id, "model weight download is unsupported");
                Err(RegistryError::DownloadUnsupported(canonical_id))
            }
        }
    }

    /// `ensureLoaded`: drives a model to `Ready`, coalescing concurrent
    /// callers onto a single in-flight activation.
    pub async fn ensure_loaded(&self, identifier: &str) -> Result<Arc<ModelInfo>, RegistryError> {
        let (state, canonical_id) = self.schedule_model_sync(identifier, false)?;
        if state == ModelState::Ready {
            return self.info_for(&canonical_id);
        }

        let waiter = {
            let mut entries = self.entries.lock();
            let entry = entries.get_mut(&canonical_id).expect("scheduled above");
            if entry.state == ModelState::Ready {
                return self.info_for(&canonical_id);
            }
            if let Some(existing) = entry.activation_waiter.clone() {
                existing
            } else {
                let waiter = ActivationWaiter::new();
                entry.activation_waiter = Some(waiter.clone());
                entry.state = ModelState::Activating;
                drop(entries);
                self.send_load_model(&canonical_id).await;
                waiter
            }
        };

        waiter.wait().await.map_err(RegistryError::ActivationFailed)?;
        self.info_for(&canonical_id)
    }

    async fn send_load_model(&self, canonical_id: &str) {
        let model_path = {
            let entries = self.entries.lock();
            entries.get(canonical_id).and_then(|e| e.resolved.as_ref()).map(|r| r.model_path.clone())
        };
        let Some(model_path) = model_path else { return };

        let request = LoadModelRequest {
            requested_id: canonical_id.to_owned(),
            canonical_id: canonical_id.to_owned(),
            model_path: model_path.to_string_lossy().into_owned(),
            wait_for_completion: false,
        };

        match self.transport.send_load_model(&request).await {
            Ok(reply) => self.handle_load_model_reply(canonical_id, reply),
            Err(err) => self.fail_activation(canonical_id, err.to_string()),
        }
    }

    fn handle_load_model_reply(&self, canonical_id: &str, reply: LoadModelReply) {
        match reply.status {
            LoadModelStatus::Ok => {
                let capabilities = reply.data.map(|d| d.load_model.capabilities).unwrap_or_default();
                self.complete_activation(canonical_id, capabilities);
            }
            LoadModelStatus::Accepted => {
                // Stays `Activating`; `handle_model_loaded` completes it.
            }
            LoadModelStatus::Rejected => {
                let message = reply.message.unwrap_or_else(|| "load_model rejected".to_owned());
                self.fail_activation(canonical_id, message);
            }
        }
    }

    /// Advances `ACTIVATING → READY` on a `model_loaded` broadcast event.
    /// A no-op if the entry is not currently activating or belongs to a
    /// different model.
    pub fn handle_model_loaded(&self, model_id: &str, capabilities: HashMap<String, Vec<i64>>) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(model_id) else { return };
        if entry.state != ModelState::Activating {
            return;
        }
        drop(entries);
        self.complete_activation(model_id, capabilities);
    }

    fn complete_activation(&self, canonical_id: &str, capabilities: HashMap<String, Vec<i64>>) {
        let waiter = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(canonical_id) else { return };
            entry.state = ModelState::Ready;
            if let Some(info) = entry.info.take() {
                entry.info = Some(Arc::new(ModelInfo {
                    canonical_id: info.canonical_id.clone(),
                    model_path: info.model_path.clone(),
                    formatter: info.formatter.clone(),
                    capabilities,
                }));
            }
            entry.activation_waiter.take()
        };
        info!(model_id = %canonical_id, "model activated");
        if let Some(waiter) = waiter {
            waiter.complete(Ok(()));
        }
    }

    fn fail_activation(&self, canonical_id: &str, message: String) {
        let waiter = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(canonical_id) else { return };
            entry.fail(message.clone());
            entry.activation_waiter.take()
        };
        warn!(model_id = %canonical_id, error = %message, "model activation failed");
        if let Some(waiter) = waiter {
            waiter.complete(Err(message));
        }
    }

    fn info_for(&self, canonical_id: &str) -> Result<Arc<ModelInfo>, RegistryError> {
        let entries = self.entries.lock();
        match entries.get(canonical_id) {
            Some(entry) if entry.state == ModelState::Ready => {
                Ok(entry.info.clone().expect("ready entry carries info"))
            }
            Some(entry) => Err(RegistryError::LoadRejected(
                entry.error.clone().unwrap_or_else(|| format!("{canonical_id} is not ready")),
            )),
            None => Err(RegistryError::NotFound(canonical_id.to_owned())),
        }
    }

    pub fn state_of(&self, canonical_id: &str) -> Option<ModelState> {
        self.entries.lock().get(canonical_id).map(|e| e.state)
    }
}

fn load_formatter(model_path: &std::path::Path) -> Result<pie_formatter::ControlTokens, RegistryError> {
    let config_path = model_path.join("config.json");
    pie_formatter::ControlTokens::load(&config_path).map_err(|err| match err {
        pie_formatter::FormatterError::ConfigNotFound(path) => RegistryError::MissingConfig(path),
        other => RegistryError::Formatter(other),
    })
}
