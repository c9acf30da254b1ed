//! One streamed chunk of a model response.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One delta for one `request_id`.
///
/// Deltas for a single request arrive in order over one topic. Multiple
/// candidates are distinguished by `candidate_index`; multiple prompts in a
/// batch request are distinguished by `prompt_index`.
///
/// On the wire the "is this the last delta" flag is called `is_final_delta`;
/// it is exposed here as `is_final` since every other field already drops
/// redundant qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientDelta {
    pub request_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tokens_in_delta: Option<u32>,
    #[serde(default)]
    pub tokens: Vec<i64>,
    #[serde(default)]
    pub top_logprobs: Vec<HashMap<String, f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_logprob: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_len: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_len: Option<u32>,
    #[serde(rename = "is_final_delta", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_delta() {
        let json = r#"{
            "request_id": 42,
            "content": "Hello, world!",
            "is_final_delta": true,
            "finish_reason": "stop",
            "prompt_token_count": 10,
            "generation_len": 5
        }"#;
        let delta: ClientDelta = serde_json::from_str(json).unwrap();
        assert_eq!(delta.request_id, 42);
        assert_eq!(delta.content.as_deref(), Some("Hello, world!"));
        assert!(delta.is_final);
        assert_eq!(delta.finish_reason.as_deref(), Some("stop"));
        assert_eq!(delta.prompt_token_count, Some(10));
        assert_eq!(delta.generation_len, Some(5));
    }

    #[test]
    fn missing_fields_default() {
        let delta: ClientDelta = serde_json::from_str(r#"{"request_id":1}"#).unwrap();
        assert_eq!(delta.request_id, 1);
        assert_eq!(delta.content, None);
        assert!(!delta.is_final);
        assert_eq!(delta.finish_reason, None);
        assert!(delta.tokens.is_empty());
    }
}
