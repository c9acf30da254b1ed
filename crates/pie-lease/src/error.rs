use thiserror::Error;

/// Engine-lease error kind.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("engine did not become ready in time")]
    StartupTimeout,
    #[error("engine failed to start: {0}")]
    StartupFailed(String),
    #[error("failed to shut down engine pid {0}")]
    ShutdownFailed(u32),
    #[error("timed out acquiring the lease lock")]
    LockTimeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
