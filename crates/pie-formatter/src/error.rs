use thiserror::Error;

/// Formatter and multimodal-rendering error kinds.
#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("control_tokens.json not found at {0}")]
    ConfigNotFound(String),
    #[error("invalid control_tokens.json: {0}")]
    InvalidConfig(String),
    #[error("no profile found for model {0}")]
    ProfileNotFound(String),
    #[error("template {0} not found in profile")]
    TemplateNotFound(String),

    #[error("image part is not a data: URL: {0}")]
    InvalidDataUrl(String),
    #[error("data: URL payload is not valid base64")]
    InvalidBase64,
    #[error("content part has an invalid \"type\" field")]
    InvalidContentType,
    #[error("content part is missing its \"type\" field")]
    MissingType,
    #[error("text part is missing its \"text\" field")]
    MissingText,
    #[error("image part is missing its url")]
    MissingImageUrl,
    #[error("capability part is missing its \"name\" field")]
    MissingCapabilityName,
    #[error("capability part is missing its data payload")]
    MissingCapabilityData,
    #[error("content part has an unsupported type: {0}")]
    UnsupportedContentType(String),
    #[error("rendered prompt is empty")]
    EmptyPrompt,
    #[error("image placeholder count {placeholders} does not match image count {images}")]
    PlaceholderMismatch { placeholders: usize, images: usize },
    #[error("coord placeholder count {placeholders} does not match coord capability count {coords}")]
    CoordPlaceholderMismatch { placeholders: usize, coords: usize },
}
