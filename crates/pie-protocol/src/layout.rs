//! Layout segments: the ordered byte-composition description packed
//! alongside a prompt's binary blobs.

use crate::frame::FrameError;

/// 16-byte on-wire layout record: `{u8 type, 7 bytes zero pad, u64 length LE}`.
pub const LAYOUT_SEGMENT_SIZE: usize = 16;

/// The kind of content a [`LayoutSegment`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSegmentType {
    Text = 0,
    Image = 1,
    Capability = 2,
}

impl LayoutSegmentType {
    fn from_u8(value: u8) -> Result<Self, FrameError> {
        match value {
            0 => Ok(LayoutSegmentType::Text),
            1 => Ok(LayoutSegmentType::Image),
            2 => Ok(LayoutSegmentType::Capability),
            other => Err(FrameError::UnsupportedSegmentType(other)),
        }
    }
}

/// One layout record: a segment type and its byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSegment {
    pub segment_type: LayoutSegmentType,
    pub length: u64,
}

impl LayoutSegment {
    pub fn text(length: u64) -> Self {
        LayoutSegment { segment_type: LayoutSegmentType::Text, length }
    }
    pub fn image(length: u64) -> Self {
        LayoutSegment { segment_type: LayoutSegmentType::Image, length }
    }
    pub fn capability(length: u64) -> Self {
        LayoutSegment { segment_type: LayoutSegmentType::Capability, length }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.segment_type as u8);
        out.extend_from_slice(&[0u8; 7]);
        out.extend_from_slice(&self.length.to_le_bytes());
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < LAYOUT_SEGMENT_SIZE {
            return Err(FrameError::TruncatedLayout);
        }
        let segment_type = LayoutSegmentType::from_u8(bytes[0])?;
        let mut length_bytes = [0u8; 8];
        length_bytes.copy_from_slice(&bytes[8..16]);
        Ok(LayoutSegment { segment_type, length: u64::from_le_bytes(length_bytes) })
    }
}

/// Decode a contiguous run of layout records.
pub fn decode_all(bytes: &[u8], count: usize) -> Result<Vec<LayoutSegment>, FrameError> {
    let mut segments = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * LAYOUT_SEGMENT_SIZE;
        let end = start + LAYOUT_SEGMENT_SIZE;
        let slice = bytes.get(start..end).ok_or(FrameError::TruncatedLayout)?;
        segments.push(LayoutSegment::decode(slice)?);
    }
    Ok(segments)
}

/// Validate that segment lengths sum correctly against declared blob totals.
pub fn validate(
    segments: &[LayoutSegment],
    text_size: u64,
    total_image_size: u64,
) -> Result<(), FrameError> {
    let text_sum: u64 = segments
        .iter()
        .filter(|s| s.segment_type == LayoutSegmentType::Text)
        .map(|s| s.length)
        .sum();
    if text_sum != text_size {
        return Err(FrameError::LayoutMismatch {
            kind: "text",
            expected: text_size,
            got: text_sum,
        });
    }

    let image_sum: u64 = segments
        .iter()
        .filter(|s| s.segment_type == LayoutSegmentType::Image)
        .map(|s| s.length)
        .sum();
    if image_sum != total_image_size {
        return Err(FrameError::LayoutMismatch {
            kind: "image",
            expected: total_image_size,
            got: image_sum,
        });
    }

    Ok(())
}
