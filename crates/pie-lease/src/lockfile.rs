//! `engine.lock`: advisory exclusive file lock guarding `engine.pid` and
//! `engine.refs`. `fs2` only exposes blocking and try-lock variants, so a
//! bounded wait is built by polling `try_lock`.

use crate::error::LeaseError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Blocks the calling thread (not the async runtime) until the lock is
    /// acquired or `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LeaseError> {
        let file = OpenOptions::new().create(true).write(true).open(path)?;
        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(FileLock { file }),
                Err(_) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
                Err(_) => return Err(LeaseError::LockTimeout),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
