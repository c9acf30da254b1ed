//! Conversation rendering: control tokens + role tags + parts → prompt text.

use crate::control_tokens::ControlTokens;
use crate::conversation::{parse_content, Interaction, Part};
use crate::error::FormatterError;
use crate::image::decode_data_url;
use crate::role::normalize_role;

/// Output of rendering a conversation: the prompt text (with placeholder
/// tokens still literally present) and the decoded images/capabilities, in
/// the order their placeholders appear in the text.
pub struct Rendered {
    pub text: String,
    pub images: Vec<Vec<u8>>,
    pub capabilities: Vec<(String, Vec<u8>)>,
}

/// Render one conversation to prompt text, applying the profile's role tags
/// and appending an agent-role priming tag if `add_generation_prompt`.
pub fn render_conversation(
    tokens: &ControlTokens,
    conversation: &[Interaction],
    instructions: Option<&str>,
    add_generation_prompt: bool,
) -> Result<Rendered, FormatterError> {
    let known_roles: Vec<&str> = tokens.roles.keys().map(String::as_str).collect();
    let mut output = tokens.begin_of_text.clone();
    let mut images = Vec::new();
    let mut capabilities = Vec::new();

    let instructions_interaction;
    let mut interactions: Vec<&Interaction> = Vec::with_capacity(conversation.len() + 1);
    if let Some(text) = instructions {
        instructions_interaction = Interaction {
            role: Some("system".to_owned()),
            content: crate::conversation::Content::Text(text.to_owned()),
        };
        interactions.push(&instructions_interaction);
    }
    interactions.extend(conversation.iter());

    for interaction in interactions {
        let role_name = normalize_role(interaction.role.as_deref(), &known_roles);
        if let Some(tag) = tokens.role(&role_name) {
            output.push_str(&tag.role_start_tag);
            output.push_str(&tag.role_name);
            output.push_str(&tag.role_end_tag);
        }
        for part in parse_content(&interaction.content)? {
            match part {
                Part::Text(text) => output.push_str(&text),
                Part::Image(url) => {
                    images.push(decode_data_url(&url)?);
                    output.push_str(tokens.image_placeholder());
                }
                Part::Capability { name, payload } => {
                    capabilities.push((name, payload));
                    if let Some(placeholder) = &tokens.coord_placeholder {
                        output.push_str(placeholder);
                    }
                }
            }
        }
        output.push_str(&tokens.end_of_sequence);
    }

    if add_generation_prompt {
        if let Some(agent) = tokens.role("agent") {
            output.push_str(&agent.role_start_tag);
            output.push_str(&agent.role_name);
            output.push_str(&agent.role_end_tag);
        }
    }

    Ok(Rendered { text: output, images, capabilities })
}
