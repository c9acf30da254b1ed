//! JSON header carried at the front of a request frame.

use crate::chat_params::ChatParameters;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// The kind of work a request frame asks the engine to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum RequestType {
    Generation = 0,
    Embedding = 1,
    Query = 2,
    Point = 3,
    Detect = 4,
    Agent = 5,
    Omni = 6,
}

/// A named, positioned capability blob referenced by a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRef {
    pub name: String,
    /// Byte position of the capability's placeholder within the prompt text.
    pub position: u64,
    pub payload_size: u64,
}

/// Per-prompt metadata: offsets/sizes of blobs inside the binary region,
/// plus generation parameters for this prompt.
///
/// Fields are declared in alphabetical order so that plain `serde_json`
/// struct serialization (which preserves declaration order) produces
/// sorted-key JSON, matching the engine's own header parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMetadata {
    #[serde(default)]
    pub capabilities: Vec<CapabilityRef>,
    #[serde(default)]
    pub capability_data_offset: u64,
    #[serde(default)]
    pub capability_data_size: u64,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub image_data_offset: u64,
    #[serde(default)]
    pub image_data_size: u64,
    #[serde(default)]
    pub image_sizes_offset: u64,
    pub layout_count: u32,
    pub layout_offset: u64,
    pub parameters: ChatParameters,
    pub text_offset: u64,
    pub text_size: u64,
}

/// The JSON header of a request frame.
///
/// Serialized with sorted keys — `serde_json::to_string` on a `BTreeMap`-free
/// struct already emits fields in declaration order, so field declaration
/// order here is alphabetical to produce the bit-exact sorted-key output the
/// wire format requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHeader {
    pub model_id: String,
    pub model_path: String,
    pub prompts: Vec<PromptMetadata>,
    pub request_channel_id: u64,
    pub request_id: u64,
    pub request_type: RequestType,
    pub response_channel_id: u64,
}
