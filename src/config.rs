//! Caller-supplied configuration. This
//! library has no config file of its own, unlike the engine-side
//! `ForwarderConfig`-style TOML loading — the embedding application owns
//! configuration surface and constructs a [`ClientConfig`] directly in code.

use std::path::PathBuf;
use std::time::Duration;

/// Knobs the host application may need to override; every field has a
/// documented default matching the engine's own expectations.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Path to the engine executable, as produced by the binary
    /// fetcher/installer, which is out of scope for this library.
    pub engine_executable: PathBuf,
    /// Extra arguments passed to the engine subprocess.
    pub engine_args: Vec<String>,
    /// Overrides the OS-appropriate cache root; falls back to
    /// `$ORCHARD_IPC_ROOT` then the OS cache directory when unset.
    pub cache_root: Option<PathBuf>,
    /// Root directory the model resolver looks repo ids up under; defaults
    /// to `<cache_root>/models` when unset.
    pub model_cache_root: Option<PathBuf>,
    /// Per-call timeout for management-socket commands (default 30s).
    pub management_timeout: Duration,
    /// Dial attempts for each IPC socket (default 50 attempts, 200ms apart).
    pub dial_attempts: u32,
    pub dial_delay: Duration,
    /// How long to wait for the engine's first telemetry event before
    /// `STARTUP_TIMEOUT` (default 60s).
    pub startup_timeout: Duration,
    /// Timeout for acquiring the cross-process lease file lock (default 30s).
    pub lock_timeout: Duration,
}

impl ClientConfig {
    pub fn new(engine_executable: PathBuf) -> Self {
        ClientConfig {
            engine_executable,
            engine_args: Vec::new(),
            cache_root: None,
            model_cache_root: None,
            management_timeout: pie_ipc::DEFAULT_MANAGEMENT_TIMEOUT,
            dial_attempts: pie_ipc::DEFAULT_DIAL_ATTEMPTS,
            dial_delay: pie_ipc::DEFAULT_DIAL_DELAY,
            startup_timeout: pie_lease::LeaseConfig::new(PathBuf::new(), PathBuf::new()).startup_timeout,
            lock_timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn resolved_cache_root(&self) -> PathBuf {
        self.cache_root.clone().unwrap_or_else(pie_lease::cache_root)
    }

    pub(crate) fn resolved_model_cache_root(&self) -> PathBuf {
        self.model_cache_root.clone().unwrap_or_else(|| self.resolved_cache_root().join("models"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_the_default_timeouts() {
        let config = ClientConfig::new(PathBuf::from("/usr/local/bin/pie-engine"));
        assert_eq!(config.management_timeout, Duration::from_secs(30));
        assert_eq!(config.startup_timeout, Duration::from_secs(60));
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
    }

    #[test]
    fn cache_root_override_is_honored() {
        let mut config = ClientConfig::new(PathBuf::from("/bin/true"));
        config.cache_root = Some(PathBuf::from("/tmp/explicit-root"));
        assert_eq!(config.resolved_cache_root(), PathBuf::from("/tmp/explicit-root"));
    }
}
