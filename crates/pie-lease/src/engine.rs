//! Spawning the engine subprocess and waiting for it to announce readiness
//! over the response socket's first telemetry broadcast.

use crate::error::LeaseError;
use pie_ipc::{IpcEndpoints, ManagedSocket, TransportError};
use pie_protocol::{parse_event_body, Telemetry, EVENT_PREFIX};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
const READINESS_POLL_STEP: Duration = Duration::from_millis(200);

pub struct SpawnedEngine {
    pub child: Child,
    pub pid: u32,
}

/// Launches the engine executable with stdout/stderr redirected to
/// `log_path`. Does not wait for readiness.
pub fn spawn(executable: &Path, args: &[String], log_path: &Path) -> Result<SpawnedEngine, LeaseError> {
    let stdout_log = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let stderr_log = stdout_log.try_clone()?;
    let child = Command::new(executable)
        .args(args)
        .stdout(Stdio::from(stdout_log))
        .stderr(Stdio::from(stderr_log))
        .spawn()?;
    let pid = child.id();
    Ok(SpawnedEngine { child, pid })
}

/// Blocks the calling thread until the engine's first telemetry event
/// arrives, returning the pid it reports in that event's `health.pid`
/// field. Fails with `StartupFailed` if the process exits first,
/// `StartupTimeout` after `timeout`.
pub fn wait_for_readiness(ipc_dir: &Path, child: &mut Child, timeout: Duration) -> Result<u32, LeaseError> {
    let endpoints = IpcEndpoints::under_ipc_dir(ipc_dir);
    let ctx = zmq::Context::new();
    let sub = ManagedSocket::subscribe_before_dial(
        &ctx,
        "readiness",
        &endpoints.response_url,
        &[EVENT_PREFIX.as_bytes()],
        pie_ipc::DEFAULT_DIAL_ATTEMPTS,
        pie_ipc::DEFAULT_DIAL_DELAY,
    )
    .map_err(|err| LeaseError::StartupFailed(err.to_string()))?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(LeaseError::StartupFailed(format!("engine exited before becoming ready: {status}")));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(LeaseError::StartupTimeout);
        }

        match sub.receive(remaining.min(READINESS_POLL_STEP)) {
            Ok(frame) => {
                if let Some(pid) = pid_from_telemetry_frame(&frame) {
                    sub.close();
                    return Ok(pid);
                }
            }
            Err(TransportError::Timeout) => continue,
            Err(other) => return Err(LeaseError::StartupFailed(other.to_string())),
        }
    }
}

fn pid_from_telemetry_frame(frame: &[u8]) -> Option<u32> {
    let after_prefix = frame.strip_prefix(EVENT_PREFIX.as_bytes())?;
    let event = parse_event_body(after_prefix)?;
    if event.name != "telemetry" {
        return None;
    }
    let telemetry: Telemetry = serde_json::from_value(event.body).ok()?;
    telemetry.health.map(|h| h.pid as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_telemetry_event_yields_no_pid() {
        let frame = format!("{}model_loaded\0{{\"model_id\":\"x\"}}", EVENT_PREFIX);
        assert_eq!(pid_from_telemetry_frame(frame.as_bytes()), None);
    }

    #[test]
    fn telemetry_event_without_health_yields_no_pid() {
        let frame = format!("{}telemetry\0{{\"gpu_total_bytes\":0,\"gpu_reserved_bytes\":0}}", EVENT_PREFIX);
        assert_eq!(pid_from_telemetry_frame(frame.as_bytes()), None);
    }

    #[test]
    fn telemetry_event_with_health_yields_its_pid() {
        let frame = format!("{}telemetry\0{{\"health\":{{\"pid\":4242}}}}", EVENT_PREFIX);
        assert_eq!(pid_from_telemetry_frame(frame.as_bytes()), Some(4242));
    }

    #[test]
    fn frame_without_event_prefix_yields_no_pid() {
        assert_eq!(pid_from_telemetry_frame(b"resp:0000000000000001:garbage"), None);
    }
}
