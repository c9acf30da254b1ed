use base64::Engine;
use pie_formatter::{conversation::Content, format_prompt, ControlTokens, FormatterError, Interaction};
use pie_protocol::ChatParameters;

const PROFILE_JSON: &str = r#"{
    "template_type": "llama",
    "begin_of_text": "<|begin_of_text|>",
    "end_of_message": "<|eom_id|>",
    "end_of_sequence": "<|eot_id|>",
    "start_image_token": "<|image|>",
    "roles": {
        "agent": {"role_name": "assistant", "role_start_tag": "<|h|>", "role_end_tag": "<|/h|>"},
        "user": {"role_name": "user", "role_start_tag": "<|h|>", "role_end_tag": "<|/h|>"},
        "system": {"role_name": "system", "role_start_tag": "<|h|>", "role_end_tag": "<|/h|>"}
    }
}"#;

#[test]
fn text_only_conversation_produces_a_single_text_segment() {
    let tokens = ControlTokens::parse(PROFILE_JSON).unwrap();
    let conversation = vec![Interaction { role: Some("user".to_owned()), content: Content::Text("hello there".to_owned()) }];
    let blobs = format_prompt(&tokens, &conversation, None, true, true, ChatParameters::default()).unwrap();
    assert!(blobs.images.is_empty());
    assert_eq!(blobs.layout.len(), 1);
    assert!(!blobs.text.is_empty());
}

#[test]
fn multimodal_conversation_with_instructions_prepended() {
    let tokens = ControlTokens::parse(PROFILE_JSON).unwrap();
    let image_bytes = [0x01u8, 0x02, 0x03, 0x04];
    let data_url = format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(image_bytes));
    let conversation = vec![Interaction {
        role: Some("user".to_owned()),
        content: Content::Parts(vec![
            serde_json::json!({"type": "text", "text": "what is this? "}),
            serde_json::json!({"type": "image_url", "image_url": {"url": data_url}}),
        ]),
    }];
    let blobs = format_prompt(&tokens, &conversation, Some("be concise"), true, true, ChatParameters::default()).unwrap();
    assert_eq!(blobs.images, vec![image_bytes.to_vec()]);
    assert_eq!(blobs.layout.iter().filter(|s| s.segment_type == pie_protocol::LayoutSegmentType::Image).count(), 1);
}

#[test]
fn image_part_without_matching_placeholder_token_fails() {
    let mut tokens = ControlTokens::parse(PROFILE_JSON).unwrap();
    tokens.start_image_token = Some("<|never-appears|>".to_owned());
    let image_bytes = [0x09u8];
    let data_url = format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(image_bytes));
    let conversation = vec![Interaction {
        role: Some("user".to_owned()),
        content: Content::Parts(vec![serde_json::json!({"type": "image", "image_url": data_url})]),
    }];
    // `format_prompt` always derives its placeholder from the same
    // `image_placeholder()` the renderer used, so this exercises
    // `build_layout`'s mismatch detection directly, against a placeholder a
    // caller passes in by hand rather than one `format_prompt` would ever
    // produce.
    let rendered = pie_formatter::render::render_conversation(&tokens, &conversation, None, false).unwrap();
    let err = pie_formatter::layout::build_layout(&rendered.text, "<|image|>", None, &[1], &[], true).unwrap_err();
    assert!(matches!(err, FormatterError::PlaceholderMismatch { .. }));
}

#[test]
fn capabilities_image_override_is_honored_without_a_start_image_token() {
    let profile = r#"{
        "template_type": "llama",
        "begin_of_text": "<|begin_of_text|>",
        "end_of_message": "<|eom_id|>",
        "end_of_sequence": "<|eot_id|>",
        "capabilities": {"image": "<|img-custom|>"},
        "roles": {
            "agent": {"role_name": "assistant", "role_start_tag": "<|h|>", "role_end_tag": "<|/h|>"},
            "user": {"role_name": "user", "role_start_tag": "<|h|>", "role_end_tag": "<|/h|>"}
        }
    }"#;
    let tokens = ControlTokens::parse(profile).unwrap();
    let image_bytes = [0x05u8, 0x06];
    let data_url = format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(image_bytes));
    let conversation = vec![Interaction {
        role: Some("user".to_owned()),
        content: Content::Parts(vec![serde_json::json!({"type": "image", "image_url": data_url})]),
    }];
    let blobs = format_prompt(&tokens, &conversation, None, true, true, ChatParameters::default()).unwrap();
    assert_eq!(blobs.images, vec![image_bytes.to_vec()]);
    assert_eq!(blobs.layout.iter().filter(|s| s.segment_type == pie_protocol::LayoutSegmentType::Image).count(), 1);
}
