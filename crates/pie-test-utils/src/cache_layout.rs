//! Tempdir-rooted cache layouts matching what `pie-lease` and `pie-registry`
//! expect on disk, for tests that exercise those crates without touching a
//! real OS cache directory.

use std::path::{Path, PathBuf};

/// A `tempfile::TempDir` pre-populated with the `ipc/` subdirectory the
/// lease manager expects under its cache root.
pub struct CacheLayout {
    pub dir: tempfile::TempDir,
}

impl CacheLayout {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::create_dir_all(dir.path().join("ipc")).expect("create ipc dir");
        CacheLayout { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ipc_dir(&self) -> PathBuf {
        self.dir.path().join("ipc")
    }

    /// Writes a `config.json` fixture for a local model directory named
    /// `model_id` directly under the cache root, returning its path.
    pub fn write_model_config(&self, model_id: &str, config_json: &serde_json::Value) -> PathBuf {
        let model_dir = self.dir.path().join(model_id);
        std::fs::create_dir_all(&model_dir).expect("create model dir");
        std::fs::write(model_dir.join("config.json"), config_json.to_string()).expect("write config.json");
        model_dir
    }
}

impl Default for CacheLayout {
    fn default() -> Self {
        Self::new()
    }
}
