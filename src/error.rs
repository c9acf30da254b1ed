//! The root-facing error type: every sub-crate's error wrapped as a
//! variant, plus the facade-level additions below.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no model specified and no default model is configured")]
    NoModelSpecified,
    #[error("client is not initialized")]
    NotInitialized,
    #[error("client is closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] pie_ipc::TransportError),
    #[error(transparent)]
    Frame(#[from] pie_protocol::FrameError),
    #[error(transparent)]
    Formatter(#[from] pie_formatter::FormatterError),
    #[error(transparent)]
    Registry(#[from] pie_registry::RegistryError),
    #[error(transparent)]
    Lease(#[from] pie_lease::LeaseError),
}
