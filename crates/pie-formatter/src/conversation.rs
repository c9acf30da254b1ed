//! Conversation input types: an ordered sequence of `{role, content}`
//! interactions, where content is either plain text or a list of typed
//! parts.

use crate::error::FormatterError;
use crate::image::decode_data_url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<Value>),
}

/// A normalized content part, after parsing the caller's loosely-typed JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// A `data:` URL, not yet decoded.
    Image(String),
    Capability { name: String, payload: Vec<u8> },
}

fn image_url_from(obj: &serde_json::Map<String, Value>) -> Option<String> {
    if let Some(nested) = obj.get("image_url") {
        if let Some(s) = nested.as_str() {
            return Some(s.to_owned());
        }
        if let Some(url) = nested.get("url").and_then(Value::as_str) {
            return Some(url.to_owned());
        }
    }
    obj.get("url").and_then(Value::as_str).map(str::to_owned)
}

/// Parse one loosely-typed JSON content part into a [`Part`].
pub fn parse_part(value: &Value) -> Result<Part, FormatterError> {
    let obj = value.as_object().ok_or(FormatterError::InvalidContentType)?;
    let part_type = obj.get("type").and_then(Value::as_str).ok_or(FormatterError::MissingType)?;
    match part_type {
        "text" | "input_text" => {
            let text = obj.get("text").and_then(Value::as_str).ok_or(FormatterError::MissingText)?;
            Ok(Part::Text(text.to_owned()))
        }
        "image" | "input_image" | "image_url" => {
            let url = image_url_from(obj).ok_or(FormatterError::MissingImageUrl)?;
            Ok(Part::Image(url))
        }
        "capability" => {
            let name = obj.get("name").and_then(Value::as_str).ok_or(FormatterError::MissingCapabilityName)?;
            let data_url = obj.get("data").and_then(Value::as_str).ok_or(FormatterError::MissingCapabilityData)?;
            let payload = decode_data_url(data_url)?;
            Ok(Part::Capability { name: name.to_owned(), payload })
        }
        other => Err(FormatterError::UnsupportedContentType(other.to_owned())),
    }
}

/// Parse all parts of a [`Content`] value. A plain-text `Content` yields a
/// single `Text` part.
pub fn parse_content(content: &Content) -> Result<Vec<Part>, FormatterError> {
    match content {
        Content::Text(text) => Ok(vec![Part::Text(text.clone())]),
        Content::Parts(values) => values.iter().map(parse_part).collect(),
    }
}
