//! Layout construction: ties the rendered prompt text to placeholder
//! positions for images and capabilities.

use crate::error::FormatterError;
use pie_protocol::LayoutSegment;

#[derive(Clone, Copy)]
enum PlaceholderKind {
    Image,
    Capability,
}

struct Occurrence {
    start: usize,
    end: usize,
    kind: PlaceholderKind,
}

fn find_occurrences(text: &str, placeholder: &str, kind: PlaceholderKind) -> Vec<Occurrence> {
    if placeholder.is_empty() {
        return Vec::new();
    }
    text.match_indices(placeholder)
        .map(|(start, matched)| Occurrence { start, end: start + matched.len(), kind })
        .collect()
}

/// The final text blob (with placeholder tokens stripped when
/// `exclude_image_placeholder` is set) and its layout segments.
pub struct BuiltLayout {
    pub text_blob: Vec<u8>,
    pub segments: Vec<LayoutSegment>,
    /// Byte position of each capability's placeholder within `text`, in the
    /// same order `capability_lengths` was given.
    pub capability_positions: Vec<u64>,
}

/// Build layout segments for a rendered prompt.
///
/// `image_lengths` and `capability_lengths` must be in the same order the
/// placeholders appear in `text` (the order [`crate::render::render_conversation`]
/// encounters them in).
pub fn build_layout(
    text: &str,
    image_placeholder: &str,
    coord_placeholder: Option<&str>,
    image_lengths: &[u64],
    capability_lengths: &[u64],
    exclude_image_placeholder: bool,
) -> Result<BuiltLayout, FormatterError> {
    if image_lengths.is_empty() && capability_lengths.is_empty() {
        if text.is_empty() {
            return Err(FormatterError::EmptyPrompt);
        }
        return Ok(BuiltLayout {
            text_blob: text.as_bytes().to_vec(),
            segments: vec![LayoutSegment::text(text.len() as u64)],
            capability_positions: Vec::new(),
        });
    }

    let image_occurrences = find_occurrences(text, image_placeholder, PlaceholderKind::Image);
    if image_occurrences.len() != image_lengths.len() {
        return Err(FormatterError::PlaceholderMismatch {
            placeholders: image_occurrences.len(),
            images: image_lengths.len(),
        });
    }

    let mut capability_occurrences = Vec::new();
    if let Some(coord) = coord_placeholder {
        capability_occurrences = find_occurrences(text, coord, PlaceholderKind::Capability);
        if capability_occurrences.len() != capability_lengths.len() {
            return Err(FormatterError::CoordPlaceholderMismatch {
                placeholders: capability_occurrences.len(),
                coords: capability_lengths.len(),
            });
        }
    }

    let mut occurrences: Vec<Occurrence> = Vec::new();
    occurrences.extend(image_occurrences);
    occurrences.extend(capability_occurrences);
    occurrences.sort_by_key(|o| o.start);

    let mut text_blob = Vec::new();
    let mut segments = Vec::new();
    let mut capability_positions = vec![0u64; capability_lengths.len()];
    let mut cursor = 0usize;
    let mut image_index = 0usize;
    let mut capability_index = 0usize;

    for occurrence in &occurrences {
        let gap = &text[cursor..occurrence.start];
        let placeholder_text = &text[occurrence.start..occurrence.end];

        if exclude_image_placeholder {
            if !gap.is_empty() {
                text_blob.extend_from_slice(gap.as_bytes());
                segments.push(LayoutSegment::text(gap.len() as u64));
            }
        } else {
            let combined_len = gap.len() + placeholder_text.len();
            if combined_len > 0 {
                text_blob.extend_from_slice(gap.as_bytes());
                text_blob.extend_from_slice(placeholder_text.as_bytes());
                segments.push(LayoutSegment::text(combined_len as u64));
            }
        }

        match occurrence.kind {
            PlaceholderKind::Image => {
                segments.push(LayoutSegment::image(image_lengths[image_index]));
                image_index += 1;
            }
            PlaceholderKind::Capability => {
                capability_positions[capability_index] = text_blob.len() as u64;
                segments.push(LayoutSegment::capability(capability_lengths[capability_index]));
                capability_index += 1;
            }
        }
        cursor = occurrence.end;
    }

    let trailing = &text[cursor..];
    if !trailing.is_empty() {
        text_blob.extend_from_slice(trailing.as_bytes());
        segments.push(LayoutSegment::text(trailing.len() as u64));
    }

    Ok(BuiltLayout { text_blob, segments, capability_positions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_image_placeholder_splits_surrounding_text() {
        let built = build_layout("Hello <|image|> world", "<|image|>", None, &[3], &[], true).unwrap();
        assert_eq!(built.segments.len(), 3);
        assert_eq!(built.segments[0], LayoutSegment::text(6));
        assert_eq!(built.segments[1], LayoutSegment::image(3));
        assert_eq!(built.segments[2], LayoutSegment::text(6));
        assert_eq!(built.text_blob, b"Hello  world");
    }

    #[test]
    fn text_only_prompt_is_one_segment() {
        let built = build_layout("just text", "<|image|>", None, &[], &[], true).unwrap();
        assert_eq!(built.segments, vec![LayoutSegment::text(9)]);
    }

    #[test]
    fn empty_prompt_with_no_images_fails() {
        let err = build_layout("", "<|image|>", None, &[], &[], true).unwrap_err();
        assert!(matches!(err, FormatterError::EmptyPrompt));
    }

    #[test]
    fn mismatched_placeholder_count_fails() {
        let err = build_layout("no placeholder here", "<|image|>", None, &[5], &[], true).unwrap_err();
        assert!(matches!(err, FormatterError::PlaceholderMismatch { placeholders: 0, images: 1 }));
    }

    #[test]
    fn including_placeholder_keeps_its_bytes_in_text_blob() {
        let built = build_layout("Hello <|image|> world", "<|image|>", None, &[3], &[], false).unwrap();
        // "Hello " (6) + "<|image|>" (9) = 15 included in the text segment.
        assert_eq!(built.segments[0], LayoutSegment::text(15));
        assert_eq!(built.segments[1], LayoutSegment::image(3));
    }
}
