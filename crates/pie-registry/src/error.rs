use thiserror::Error;

/// Model-registry error kind.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model identifier is empty")]
    EmptyIdentifier,
    #[error("model not found: {0}")]
    NotFound(String),
    #[error("missing config at {0}")]
    MissingConfig(String),
    #[error("failed to load model: {0}")]
    LoadFailed(String),
    #[error("engine rejected load: {0}")]
    LoadRejected(String),
    #[error("activation failed for {0}")]
    ActivationFailed(String),
    #[error("model weight download is unsupported for {0}")]
    DownloadUnsupported(String),
    #[error("formatter error: {0}")]
    Formatter(#[from] pie_formatter::FormatterError),
    #[error("management transport error: {0}")]
    Transport(String),
}
