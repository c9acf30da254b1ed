//! Generation parameters accepted by a chat/generation request.
//!
//! Field defaults mirror the engine's own defaults so that a caller who only
//! sets the fields they care about gets engine-identical behavior for the
//! rest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generation parameters for one request.
///
/// All fields have engine-matching defaults via [`ChatParameters::default`];
/// most callers only override `max_generated_tokens`, `temperature`, and
/// `stop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatParameters {
    #[serde(default = "default_max_generated_tokens")]
    pub max_generated_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: i32,
    #[serde(default)]
    pub min_p: f32,
    /// Random if `None` — the engine picks a seed and may report it back.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub stop: Vec<String>,
    #[serde(default)]
    pub top_logprobs: u32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default = "default_repetition_context_size")]
    pub repetition_context_size: u32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default)]
    pub logit_bias: HashMap<i64, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    #[serde(default = "default_candidate_count")]
    pub n: u32,
    /// Defaults to `n` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
    /// Defaults to `best_of` (and transitively `n`) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_candidates: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_max_generated_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    1.0
}
fn default_top_p() -> f32 {
    1.0
}
fn default_top_k() -> i32 {
    -1
}
fn default_repetition_context_size() -> u32 {
    60
}
fn default_repetition_penalty() -> f32 {
    1.0
}
fn default_candidate_count() -> u32 {
    1
}

impl Default for ChatParameters {
    fn default() -> Self {
        ChatParameters {
            max_generated_tokens: default_max_generated_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            min_p: 0.0,
            rng_seed: None,
            stop: Vec::new(),
            top_logprobs: 0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            repetition_context_size: default_repetition_context_size(),
            repetition_penalty: default_repetition_penalty(),
            logit_bias: HashMap::new(),
            tools: None,
            response_format: None,
            n: default_candidate_count(),
            best_of: None,
            final_candidates: None,
            task_name: None,
            reasoning: false,
            reasoning_effort: None,
            instructions: None,
        }
    }
}

impl ChatParameters {
    /// Resolved `best_of`, falling back to `n` when unset.
    pub fn resolved_best_of(&self) -> u32 {
        self.best_of.unwrap_or(self.n)
    }

    /// Resolved `final_candidates`, falling back to `best_of` then `n`.
    pub fn resolved_final_candidates(&self) -> u32 {
        self.final_candidates.unwrap_or_else(|| self.resolved_best_of())
    }
}
