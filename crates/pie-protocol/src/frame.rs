//! Request frame construction and parsing.
//!
//! ```text
//! [0..4)   u32 little-endian: length L of the JSON header
//! [4..4+L) JSON header (UTF-8, sorted keys)
//! [4+L..)  binary region, laid out with 16-byte alignment between blobs
//! ```

use crate::chat_params::ChatParameters;
use crate::header::{CapabilityRef, PromptMetadata, RequestHeader, RequestType};
use crate::layout::{self, LayoutSegment, LayoutSegmentType, LAYOUT_SEGMENT_SIZE};
use thiserror::Error;

const ALIGNMENT: u64 = 16;

/// Errors raised while building or parsing a request frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("request frame must contain at least one prompt")]
    NoPrompts,
    #[error("JSON header exceeds u32::MAX bytes")]
    MetadataTooLarge,
    #[error("unsupported layout segment type byte {0}")]
    UnsupportedSegmentType(u8),
    #[error("layout {kind} length mismatch: expected {expected}, got {got}")]
    LayoutMismatch { kind: &'static str, expected: u64, got: u64 },
    #[error("truncated layout record")]
    TruncatedLayout,
    #[error("frame is shorter than its declared header length")]
    TruncatedFrame,
    #[error("header JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A capability payload to embed, at the placeholder position the formatter
/// located while rendering the prompt.
#[derive(Debug, Clone)]
pub struct CapabilityBlob {
    pub name: String,
    pub position: u64,
    pub payload: Vec<u8>,
}

/// The raw blobs and layout for one prompt in a request.
#[derive(Debug, Clone, Default)]
pub struct PromptBlobs {
    pub text: Vec<u8>,
    pub images: Vec<Vec<u8>>,
    pub capabilities: Vec<CapabilityBlob>,
    /// Explicit layout; if empty, derived as one text segment followed by
    /// one image segment per image.
    pub layout: Vec<LayoutSegment>,
    pub parameters: ChatParameters,
}

/// Everything needed to build one request frame.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub request_id: u64,
    pub model_id: String,
    pub model_path: String,
    pub request_type: RequestType,
    pub request_channel_id: u64,
    pub response_channel_id: u64,
    pub prompts: Vec<PromptBlobs>,
}

/// Appends `bytes` to `region`, inserting zero-padding so the blob starts at
/// the next multiple of 16. Returns the blob's offset, or `0` when `bytes`
/// is empty (no allocation occurs for empty blobs).
fn alloc_blob(region: &mut Vec<u8>, bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }
    let pad = (ALIGNMENT - (region.len() as u64 % ALIGNMENT)) % ALIGNMENT;
    region.resize(region.len() + pad as usize, 0);
    let offset = region.len() as u64;
    region.extend_from_slice(bytes);
    offset
}

fn derive_layout(text_len: u64, image_count: usize) -> Vec<LayoutSegment> {
    let mut segments = Vec::with_capacity(1 + image_count);
    if text_len > 0 {
        segments.push(LayoutSegment::text(text_len));
    }
    for _ in 0..image_count {
        segments.push(LayoutSegment::image(0));
    }
    segments
}

/// Build the bit-exact request frame for `req`.
pub fn build_frame(req: &FrameRequest) -> Result<Vec<u8>, FrameError> {
    if req.prompts.is_empty() {
        return Err(FrameError::NoPrompts);
    }

    let mut region = Vec::new();
    let mut prompt_metas = Vec::with_capacity(req.prompts.len());

    for prompt in &req.prompts {
        let total_image_size: u64 = prompt.images.iter().map(|b| b.len() as u64).sum();

        let layout = if prompt.layout.is_empty() {
            let mut derived = derive_layout(prompt.text.len() as u64, prompt.images.len());
            // Fill in per-image lengths for the derived layout in order.
            let mut image_iter = prompt.images.iter();
            for seg in derived.iter_mut() {
                if seg.segment_type == LayoutSegmentType::Image {
                    if let Some(img) = image_iter.next() {
                        seg.length = img.len() as u64;
                    }
                }
            }
            derived
        } else {
            prompt.layout.clone()
        };
        layout::validate(&layout, prompt.text.len() as u64, total_image_size)?;

        let text_offset = alloc_blob(&mut region, &prompt.text);

        let image_data_offset = {
            let mut concatenated = Vec::with_capacity(total_image_size as usize);
            for img in &prompt.images {
                concatenated.extend_from_slice(img);
            }
            alloc_blob(&mut region, &concatenated)
        };

        let image_sizes_offset = {
            let mut sizes_buf = Vec::with_capacity(prompt.images.len() * 8);
            for img in &prompt.images {
                sizes_buf.extend_from_slice(&(img.len() as u64).to_le_bytes());
            }
            alloc_blob(&mut region, &sizes_buf)
        };

        let capability_data_offset = {
            let mut concatenated = Vec::new();
            for cap in &prompt.capabilities {
                concatenated.extend_from_slice(&cap.payload);
            }
            alloc_blob(&mut region, &concatenated)
        };
        let capability_data_size: u64 =
            prompt.capabilities.iter().map(|c| c.payload.len() as u64).sum();

        let capability_refs: Vec<CapabilityRef> = prompt
            .capabilities
            .iter()
            .map(|c| CapabilityRef { name: c.name.clone(), position: c.position, payload_size: c.payload.len() as u64 })
            .collect();

        let mut layout_bytes = Vec::with_capacity(layout.len() * LAYOUT_SEGMENT_SIZE);
        for seg in &layout {
            seg.encode(&mut layout_bytes);
        }
        let layout_offset = alloc_blob(&mut region, &layout_bytes);

        prompt_metas.push(PromptMetadata {
            capabilities: capability_refs,
            capability_data_offset,
            capability_data_size,
            image_count: prompt.images.len() as u32,
            image_data_offset,
            image_data_size: total_image_size,
            image_sizes_offset,
            layout_count: layout.len() as u32,
            layout_offset,
            parameters: prompt.parameters.clone(),
            text_offset,
            text_size: prompt.text.len() as u64,
        });
    }

    let header = RequestHeader {
        model_id: req.model_id.clone(),
        model_path: req.model_path.clone(),
        prompts: prompt_metas,
        request_channel_id: req.request_channel_id,
        request_id: req.request_id,
        request_type: req.request_type,
        response_channel_id: req.response_channel_id,
    };

    let header_json = serde_json::to_vec(&header)?;
    if header_json.len() > u32::MAX as usize {
        return Err(FrameError::MetadataTooLarge);
    }

    let mut frame = Vec::with_capacity(4 + header_json.len() + region.len());
    frame.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    frame.extend_from_slice(&header_json);
    frame.extend_from_slice(&region);
    Ok(frame)
}

/// Parse a request frame back into its header and binary region.
pub fn parse_frame(bytes: &[u8]) -> Result<(RequestHeader, &[u8]), FrameError> {
    if bytes.len() < 4 {
        return Err(FrameError::TruncatedFrame);
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[0..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_end = 4usize.checked_add(header_len).ok_or(FrameError::TruncatedFrame)?;
    let header_json = bytes.get(4..header_end).ok_or(FrameError::TruncatedFrame)?;
    let header: RequestHeader = serde_json::from_slice(header_json)?;
    let region = &bytes[header_end..];
    Ok((header, region))
}

/// Slice a declared `(offset, size)` blob out of the binary region, checking
/// it fits within bounds.
pub fn slice_blob(region: &[u8], offset: u64, size: u64) -> Result<&[u8], FrameError> {
    if size == 0 {
        return Ok(&[]);
    }
    let start = offset as usize;
    let end = start.checked_add(size as usize).ok_or(FrameError::TruncatedFrame)?;
    region.get(start..end).ok_or(FrameError::TruncatedFrame)
}
