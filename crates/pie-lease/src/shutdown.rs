//! `SIGINT → SIGTERM → SIGKILL` escalation for stopping the engine
//! subprocess.

use crate::error::LeaseError;
use crate::pidstate::is_process_alive;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::time::{Duration, Instant};

const SIGTERM_GRACE: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Escalates signals against a pid this process does not own as a `Child`
/// (it may belong to a previous lease holder's process tree), so liveness
/// is polled via `kill(pid, 0)` rather than `Child::wait`.
pub fn stop_and_reap(pid: u32) -> Result<(), LeaseError> {
    if !is_process_alive(pid) {
        return Ok(());
    }
    send(pid, Signal::SIGINT)?;
    if wait_until_dead(pid, SIGTERM_GRACE) {
        return Ok(());
    }

    send(pid, Signal::SIGTERM)?;
    if wait_until_dead(pid, SIGTERM_GRACE) {
        return Ok(());
    }

    send(pid, Signal::SIGKILL)?;
    if wait_until_dead(pid, SIGTERM_GRACE) {
        return Ok(());
    }
    Err(LeaseError::ShutdownFailed(pid))
}

fn send(pid: u32, signal: Signal) -> Result<(), LeaseError> {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(_) => Err(LeaseError::ShutdownFailed(pid)),
    }
}

fn wait_until_dead(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_process_alive(pid) {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    !is_process_alive(pid)
}
