use pie_protocol::{
    build_frame, parse_frame, slice_blob, CapabilityBlob, ChatParameters, FrameError, FrameRequest,
    LayoutSegment, PromptBlobs, RequestType,
};

fn base_request() -> FrameRequest {
    FrameRequest {
        request_id: 1,
        model_id: "qwen2-vl".to_owned(),
        model_path: "/models/qwen2-vl".to_owned(),
        request_type: RequestType::Generation,
        request_channel_id: 11,
        response_channel_id: 0x1234_5678_9abc_def0,
        prompts: vec![PromptBlobs {
            text: b"describe this image".to_vec(),
            images: vec![vec![0u8; 32]],
            capabilities: vec![],
            layout: vec![],
            parameters: ChatParameters::default(),
        }],
    }
}

#[test]
fn derived_layout_matches_declared_blob_sizes() {
    let frame = build_frame(&base_request()).unwrap();
    let (header, region) = parse_frame(&frame).unwrap();
    let meta = &header.prompts[0];
    assert_eq!(meta.text_size, 20);
    assert_eq!(meta.image_data_size, 32);
    let layout = slice_blob(region, meta.layout_offset, (meta.layout_count as u64) * 16).unwrap();
    assert_eq!(layout.len(), 32);
}

#[test]
fn explicit_layout_mismatch_is_rejected() {
    let mut req = base_request();
    req.prompts[0].layout = vec![LayoutSegment::text(999), LayoutSegment::image(32)];
    let err = build_frame(&req).unwrap_err();
    assert!(matches!(err, FrameError::LayoutMismatch { kind: "text", .. }));
}

#[test]
fn capability_blob_is_embedded_and_referenced() {
    let mut req = base_request();
    req.prompts[0].capabilities.push(CapabilityBlob {
        name: "bbox".to_owned(),
        position: 4,
        payload: vec![1, 2, 3, 4, 5],
    });
    let frame = build_frame(&req).unwrap();
    let (header, region) = parse_frame(&frame).unwrap();
    let meta = &header.prompts[0];
    assert_eq!(meta.capabilities.len(), 1);
    assert_eq!(meta.capabilities[0].name, "bbox");
    assert_eq!(meta.capabilities[0].position, 4);
    let payload = slice_blob(region, meta.capability_data_offset, meta.capability_data_size).unwrap();
    assert_eq!(payload, &[1, 2, 3, 4, 5]);
}

#[test]
fn multiple_prompts_each_get_independent_blob_regions() {
    let mut req = base_request();
    req.prompts.push(PromptBlobs {
        text: b"second prompt".to_vec(),
        images: vec![],
        capabilities: vec![],
        layout: vec![],
        parameters: ChatParameters::default(),
    });
    let frame = build_frame(&req).unwrap();
    let (header, region) = parse_frame(&frame).unwrap();
    assert_eq!(header.prompts.len(), 2);
    let second_text = slice_blob(region, header.prompts[1].text_offset, header.prompts[1].text_size).unwrap();
    assert_eq!(second_text, b"second prompt");
}

#[test]
fn header_length_prefix_matches_actual_json_length() {
    let frame = build_frame(&base_request()).unwrap();
    let declared_len = u32::from_le_bytes(frame[0..4].try_into().unwrap()) as usize;
    let json_slice = &frame[4..4 + declared_len];
    assert!(serde_json::from_slice::<serde_json::Value>(json_slice).is_ok());
}
