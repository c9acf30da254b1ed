//! Control-token parsing and chat/multimodal prompt rendering: turns a
//! structured conversation into the `pie_protocol::PromptBlobs` the wire
//! serializer packs into a request frame.

pub mod control_tokens;
pub mod conversation;
pub mod error;
pub mod image;
pub mod layout;
pub mod render;
pub mod role;

pub use control_tokens::{ControlTokens, RoleTag, DEFAULT_IMAGE_PLACEHOLDER};
pub use conversation::{parse_content, parse_part, Content, Interaction, Part};
pub use error::FormatterError;
pub use image::decode_data_url;
pub use role::normalize_role;

use pie_protocol::{CapabilityBlob, ChatParameters, PromptBlobs};

/// Render a conversation and build its layout in one step, producing the
/// `PromptBlobs` the wire serializer needs.
pub fn format_prompt(
    tokens: &ControlTokens,
    conversation: &[Interaction],
    instructions: Option<&str>,
    add_generation_prompt: bool,
    exclude_image_placeholder: bool,
    parameters: ChatParameters,
) -> Result<PromptBlobs, FormatterError> {
    let rendered = render::render_conversation(tokens, conversation, instructions, add_generation_prompt)?;

    let image_lengths: Vec<u64> = rendered.images.iter().map(|b| b.len() as u64).collect();
    let capability_lengths: Vec<u64> = rendered.capabilities.iter().map(|(_, b)| b.len() as u64).collect();
    let placeholder = tokens.image_placeholder();

    let built = layout::build_layout(
        &rendered.text,
        placeholder,
        tokens.coord_placeholder.as_deref(),
        &image_lengths,
        &capability_lengths,
        exclude_image_placeholder,
    )?;

    let capabilities = rendered
        .capabilities
        .into_iter()
        .enumerate()
        .map(|(i, (name, payload))| {
            let position = built.capability_positions.get(i).copied().unwrap_or(0);
            CapabilityBlob { name, position, payload }
        })
        .collect();

    Ok(PromptBlobs {
        text: built.text_blob,
        images: rendered.images,
        capabilities,
        layout: built.segments,
        parameters,
    })
}
