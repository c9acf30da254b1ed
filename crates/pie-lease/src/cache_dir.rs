//! OS-appropriate cache root resolution.

use std::path::PathBuf;

const APP_DIR: &str = "com.theproxycompany";
const OVERRIDE_ENV: &str = "ORCHARD_IPC_ROOT";

/// The root directory lease state and IPC sockets live under:
/// `$ORCHARD_IPC_ROOT` if set, otherwise the OS cache directory
/// (`$XDG_CACHE_HOME`/`~/Library/Caches`/`~/.cache`) joined with
/// `com.theproxycompany`.
pub fn cache_root() -> PathBuf {
    if let Ok(overridden) = std::env::var(OVERRIDE_ENV) {
        if !overridden.is_empty() {
            return PathBuf::from(overridden);
        }
    }
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join(APP_DIR)
}

pub fn ipc_dir(root: &std::path::Path) -> PathBuf {
    root.join("ipc")
}
