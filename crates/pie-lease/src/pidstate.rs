//! `engine.pid` and `engine.refs`: the on-disk record of the running engine
//! and the client pids currently leasing it. Callers must hold `FileLock`
//! for the duration of any read-modify-write sequence.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::Path;

/// `kill(pid, 0)`-equivalent liveness probe. A process we're not permitted
/// to signal (`EPERM`) still exists, so only `ESRCH` counts as dead.
pub fn is_process_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn write_pid(path: &Path, pid: u32) -> std::io::Result<()> {
    std::fs::write(path, pid.to_string())
}

pub fn remove_if_exists(path: &Path) {
    let _ = std::fs::remove_file(path);
}

pub fn read_refs(path: &Path) -> Vec<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

pub fn write_refs(path: &Path, refs: &[u32]) -> std::io::Result<()> {
    if refs.is_empty() {
        remove_if_exists(path);
        return Ok(());
    }
    let json = serde_json::to_string(refs).expect("u32 slice always serializes");
    std::fs::write(path, json)
}

pub fn filter_alive(refs: &[u32]) -> Vec<u32> {
    refs.iter().copied().filter(|&pid| is_process_alive(pid)).collect()
}
