//! Per-model profile: control tokens and role tags parsed from
//! `control_tokens.json`.

use crate::error::FormatterError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A role's begin/end tags, as the profile names them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTag {
    pub role_name: String,
    pub role_start_tag: String,
    pub role_end_tag: String,
}

/// The parsed contents of `control_tokens.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTokens {
    pub template_type: String,
    pub begin_of_text: String,
    pub end_of_message: String,
    pub end_of_sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_image_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_image_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_start_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_end_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord_placeholder: Option<String>,
    #[serde(default)]
    pub capabilities: HashMap<String, String>,
    pub roles: HashMap<String, RoleTag>,
}

/// Default image placeholder token when a profile omits one.
pub const DEFAULT_IMAGE_PLACEHOLDER: &str = "<|image|>";

impl ControlTokens {
    pub fn parse(json: &str) -> Result<Self, FormatterError> {
        serde_json::from_str(json).map_err(|e| FormatterError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, FormatterError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| FormatterError::ConfigNotFound(path.display().to_string()))?;
        Self::parse(&text)
    }

    /// The image placeholder token this profile uses: an explicit
    /// `start_image_token` takes precedence, then a `capabilities["image"]`
    /// override, then the engine default. The single source of truth both
    /// the renderer and the layout builder consult, so the two never
    /// disagree about which token marks an image in the rendered text.
    pub fn image_placeholder(&self) -> &str {
        self.start_image_token
            .as_deref()
            .or_else(|| self.capabilities.get("image").map(String::as_str))
            .unwrap_or(DEFAULT_IMAGE_PLACEHOLDER)
    }

    pub fn role(&self, name: &str) -> Option<&RoleTag> {
        self.roles.get(name)
    }
}
