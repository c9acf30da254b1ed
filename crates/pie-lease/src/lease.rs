//! The refcounted engine lease: one engine subprocess shared by every
//! `Client` in a process. One [`LeaseManager`] should be shared (e.g.
//! behind an `Arc`) by every `Client` in a process; the on-disk
//! pidfile/refs/lock
//! triple extends that sharing across processes.

use crate::cache_dir::ipc_dir;
use crate::engine::{self, DEFAULT_STARTUP_TIMEOUT};
use crate::error::LeaseError;
use crate::lockfile::FileLock;
use crate::pidstate;
use crate::shutdown::stop_and_reap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct LeaseConfig {
    pub cache_root: PathBuf,
    pub engine_executable: PathBuf,
    pub engine_args: Vec<String>,
    pub lock_timeout: Duration,
    pub startup_timeout: Duration,
}

impl LeaseConfig {
    pub fn new(cache_root: PathBuf, engine_executable: PathBuf) -> Self {
        LeaseConfig {
            cache_root,
            engine_executable,
            engine_args: Vec::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

struct LeasePaths {
    pid: PathBuf,
    refs: PathBuf,
    lock: PathBuf,
    ready: PathBuf,
    engine_log: PathBuf,
    ipc_dir: PathBuf,
}

impl LeasePaths {
    fn under(cache_root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(cache_root)?;
        let ipc_dir = ipc_dir(cache_root);
        std::fs::create_dir_all(&ipc_dir)?;
        Ok(LeasePaths {
            pid: cache_root.join("engine.pid"),
            refs: cache_root.join("engine.refs"),
            lock: cache_root.join("engine.lock"),
            ready: cache_root.join("engine.ready"),
            engine_log: cache_root.join("engine.log"),
            ipc_dir,
        })
    }
}

pub struct LeaseManager {
    config: LeaseConfig,
    local_refcount: AtomicUsize,
}

impl LeaseManager {
    pub fn new(config: LeaseConfig) -> Self {
        LeaseManager { config, local_refcount: AtomicUsize::new(0) }
    }

    /// Runs the full acquire protocol under `engine.lock`, then increments
    /// the in-process refcount. Returns the running engine's pid.
    pub fn acquire(&self) -> Result<u32, LeaseError> {
        let paths = LeasePaths::under(&self.config.cache_root)?;
        let _lock = FileLock::acquire(&paths.lock, self.config.lock_timeout)?;

        let refs = pidstate::filter_alive(&pidstate::read_refs(&paths.refs));
        let mut pid = pidstate::read_pid(&paths.pid).filter(|&p| pidstate::is_process_alive(p));
        if pid.is_none() {
            pidstate::remove_if_exists(&paths.pid);
            pidstate::remove_if_exists(&paths.ready);
        }

        if pid.is_none() && refs.is_empty() {
            let mut spawned = engine::spawn(&self.config.engine_executable, &self.config.engine_args, &paths.engine_log)?;
            let reported_pid = engine::wait_for_readiness(&paths.ipc_dir, &mut spawned.child, self.config.startup_timeout)?;
            std::fs::write(&paths.ready, "1")?;
            pidstate::write_pid(&paths.pid, reported_pid)?;
            pid = Some(reported_pid);
            // The engine may outlive this process, possibly stopped later
            // by a different process entirely (shutdown goes through
            // `kill`, not `Child::wait`). A detached reaper thread just
            // collects the exit status if it dies while we're still alive,
            // so it never lingers as a zombie under this process.
            std::thread::spawn(move || {
                let _ = spawned.child.wait();
            });
        }

        let engine_pid = pid.expect("set by readiness wait above when absent");
        let current_pid = std::process::id();
        let mut refs = refs;
        if !refs.contains(&current_pid) {
            refs.push(current_pid);
        }
        pidstate::write_refs(&paths.refs, &refs)?;

        self.local_refcount.fetch_add(1, Ordering::SeqCst);
        Ok(engine_pid)
    }

    /// Decrements the in-process refcount; when it reaches zero, removes
    /// this process from `engine.refs` and, if no refs remain, stops the
    /// engine.
    pub fn release(&self) -> Result<(), LeaseError> {
        let previous = self.local_refcount.fetch_sub(1, Ordering::SeqCst);
        if previous != 1 {
            return Ok(());
        }

        let paths = LeasePaths::under(&self.config.cache_root)?;
        let _lock = FileLock::acquire(&paths.lock, self.config.lock_timeout)?;

        let current_pid = std::process::id();
        let refs: Vec<u32> =
            pidstate::filter_alive(&pidstate::read_refs(&paths.refs)).into_iter().filter(|&p| p != current_pid).collect();

        if refs.is_empty() {
            if let Some(engine_pid) = pidstate::read_pid(&paths.pid) {
                if pidstate::is_process_alive(engine_pid) {
                    stop_and_reap(engine_pid)?;
                }
                pidstate::remove_if_exists(&paths.pid);
                pidstate::remove_if_exists(&paths.ready);
            }
        }
        pidstate::write_refs(&paths.refs, &refs)?;
        Ok(())
    }
}
