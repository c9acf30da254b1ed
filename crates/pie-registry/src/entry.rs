//! Per-model state: state enum, cached info, and the single-slot
//! activation waiter that reconciles a synchronous management reply
//! against an asynchronous `model_loaded` broadcast.

use crate::resolver::ResolvedModel;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Idle,
    Downloading,
    Loading,
    Activating,
    Ready,
    Failed,
}

/// Cached, immutable once a model reaches `Ready`.
#[derive(Debug)]
pub struct ModelInfo {
    pub canonical_id: String,
    pub model_path: PathBuf,
    pub formatter: Arc<pie_formatter::ControlTokens>,
    pub capabilities: HashMap<String, Vec<i64>>,
}

type ActivationResult = Result<(), String>;

/// A one-shot completion signal shared by every `ensureLoaded` caller that
/// coalesced onto the same in-flight activation.
#[derive(Clone)]
pub struct ActivationWaiter {
    tx: Arc<watch::Sender<Option<ActivationResult>>>,
    rx: watch::Receiver<Option<ActivationResult>>,
}

impl ActivationWaiter {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        ActivationWaiter { tx: Arc::new(tx), rx }
    }

    pub fn complete(&self, result: ActivationResult) {
        let _ = self.tx.send(Some(result));
    }

    /// Waits until the activation this waiter guards completes, returning
    /// its result. Safe to call from any number of cloned handles.
    pub async fn wait(&self) -> ActivationResult {
        let mut rx = self.rx.clone();
        loop {
            if let Some(result) = rx.borrow().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                return Err("activation waiter dropped".to_owned());
            }
        }
    }
}

impl Default for ActivationWaiter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ModelEntry {
    pub state: ModelState,
    pub info: Option<Arc<ModelInfo>>,
    pub error: Option<String>,
    pub resolved: Option<ResolvedModel>,
    pub activation_waiter: Option<ActivationWaiter>,
}

impl ModelEntry {
    pub fn idle() -> Self {
        ModelEntry { state: ModelState::Idle, info: None, error: None, resolved: None, activation_waiter: None }
    }

    pub fn reset_for_load(&mut self, resolved: ResolvedModel) {
        self.state = ModelState::Loading;
        self.info = None;
        self.error = None;
        self.resolved = Some(resolved);
        self.activation_waiter = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = ModelState::Failed;
        self.error = Some(message.into());
    }
}
