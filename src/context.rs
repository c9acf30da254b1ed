//! The process-wide shared context: one engine lease, one registry, one
//! set of IPC sockets, reference-counted across every live [`crate::Client`]
//! in this process. Modeled on a module-level `OnceLock`-backed slot
//! holding a `Weak` handle, upgraded on every acquire and replaced only
//! once it has gone stale.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::ipc_state::{IpcState, ModelEventSink};
use crate::management_bridge::ManagementBridge;
use pie_ipc::IpcEndpoints;
use pie_lease::{LeaseConfig, LeaseManager};
use pie_registry::{Registry, Resolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tracing::warn;

impl ModelEventSink for Registry<ManagementBridge> {
    fn handle_model_loaded(&self, model_id: &str, capabilities: HashMap<String, Vec<i64>>) {
        Registry::handle_model_loaded(self, model_id, capabilities);
    }
}

static CONTEXT: OnceLock<Mutex<Weak<Context>>> = OnceLock::new();

fn slot() -> &'static Mutex<Weak<Context>> {
    CONTEXT.get_or_init(|| Mutex::new(Weak::new()))
}

/// Bundles the resources one engine subprocess's worth of clients share.
pub struct Context {
    lease: LeaseManager,
    pub(crate) registry: Arc<Registry<ManagementBridge>>,
    pub(crate) ipc: IpcState,
}

impl Context {
    /// Returns the shared context for this process, starting (or attaching
    /// to) the engine if no live context currently exists.
    ///
    /// Construction order matters: the registry is built first so its
    /// `Arc` can be downgraded into the weak back-reference [`IpcState`]
    /// needs, never the other way around.
    pub fn acquire(config: &ClientConfig) -> Result<Arc<Context>, ClientError> {
        let mut guard = slot().lock().expect("context mutex poisoned");
        if let Some(existing) = guard.upgrade() {
            return Ok(existing);
        }

        let cache_root = config.resolved_cache_root();
        let lease = LeaseManager::new(LeaseConfig {
            cache_root: cache_root.clone(),
            engine_executable: config.engine_executable.clone(),
            engine_args: config.engine_args.clone(),
            lock_timeout: config.lock_timeout,
            startup_timeout: config.startup_timeout,
        });
        lease.acquire()?;

        let context = match connect(config, &cache_root, lease) {
            Ok(context) => context,
            Err((lease, err)) => {
                if let Err(release_err) = lease.release() {
                    warn!(error = %release_err, "engine lease release failed after connect failure");
                }
                return Err(err);
            }
        };

        let context = Arc::new(context);
        *guard = Arc::downgrade(&context);
        Ok(context)
    }
}

#[cfg(test)]
impl Context {
    /// Builds a standalone `Context` bypassing the process-wide singleton
    /// slot, so a `Client`-level test can run against its own `FakeEngine`
    /// without racing other tests over the shared global.
    pub(crate) fn connect_standalone(config: &ClientConfig) -> Result<Context, ClientError> {
        let cache_root = config.resolved_cache_root();
        let lease = LeaseManager::new(LeaseConfig {
            cache_root: cache_root.clone(),
            engine_executable: config.engine_executable.clone(),
            engine_args: config.engine_args.clone(),
            lock_timeout: config.lock_timeout,
            startup_timeout: config.startup_timeout,
        });
        lease.acquire()?;
        connect(config, &cache_root, lease).map_err(|(_lease, err)| err)
    }
}

fn connect(config: &ClientConfig, cache_root: &std::path::Path, lease: LeaseManager) -> Result<Context, (LeaseManager, ClientError)> {
    let ipc_dir = pie_lease::cache_dir::ipc_dir(cache_root);
    let endpoints = IpcEndpoints::under_ipc_dir(&ipc_dir);
    let response_channel_id = pie_ipc::generate_response_channel_id();
    let sockets = match pie_ipc::IpcSockets::connect(&endpoints, response_channel_id, config.dial_attempts, config.dial_delay) {
        Ok(sockets) => Arc::new(sockets),
        Err(err) => return Err((lease, err.into())),
    };

    let bridge = ManagementBridge::new(sockets.clone(), config.management_timeout);
    let resolver = Resolver::new(config.resolved_model_cache_root());
    let registry = Arc::new(Registry::new(resolver, bridge));
    let registry_dyn: Arc<dyn ModelEventSink> = registry.clone();
    let model_events: Weak<dyn ModelEventSink> = Arc::downgrade(&registry_dyn);
    let ipc = IpcState::new(sockets, response_channel_id, model_events);

    Ok(Context { lease, registry, ipc })
}

impl Drop for Context {
    fn drop(&mut self) {
        self.ipc.close();
        if let Err(err) = self.lease.release() {
            warn!(error = %err, "engine lease release failed while dropping context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pie_test_utils::FakeEngine;
    use std::time::Duration;

    #[test]
    fn acquire_connects_to_an_already_running_fake_engine_and_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        std::fs::create_dir_all(&cache_root).unwrap();
        let ipc_dir = pie_lease::cache_dir::ipc_dir(&cache_root);
        let fake = FakeEngine::bind(&ipc_dir);

        // Pretend an engine is already running and ready, so `lease.acquire`
        // attaches instead of spawning a subprocess. A real (but harmless,
        // signal-safe) child stands in for the engine pid rather than this
        // test's own pid.
        let mut dummy_engine = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let dummy_pid = dummy_engine.id();
        std::fs::write(cache_root.join("engine.pid"), dummy_pid.to_string()).unwrap();
        std::fs::write(cache_root.join("engine.ready"), "1").unwrap();
        fake.publish_ready(dummy_pid);

        let mut config = ClientConfig::new(std::path::PathBuf::from("/bin/true"));
        config.cache_root = Some(cache_root);
        config.dial_attempts = 20;
        config.dial_delay = Duration::from_millis(20);

        let first = Context::acquire(&config).unwrap();
        let second = Context::acquire(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second), "second acquire should reuse the live context");

        drop(first);
        drop(second);
        let _ = dummy_engine.wait();
    }
}
