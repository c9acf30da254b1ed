//! Aggregated chat results. `ClientResponse` is not part of
//! the wire protocol — it is the facade's view of a completed (or batched)
//! exchange, built by folding the deltas one request produced.

use pie_protocol::ClientDelta;

/// Token accounting for one aggregated response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One request's deltas folded into a single result.
#[derive(Debug, Clone, Default)]
pub struct ClientResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
    pub deltas: Vec<ClientDelta>,
}

/// Fold an in-arrival-order run of deltas for one request into a
/// [`ClientResponse`].
///
/// - `text` is the concatenation of every non-empty `content` field.
/// - `finish_reason` is the last non-null one seen.
/// - `usage.prompt_tokens`/`completion_tokens` are the maximum
///   `prompt_token_count`/`generation_len` seen, since the engine reports
///   running totals rather than per-delta increments.
pub fn aggregate(deltas: Vec<ClientDelta>) -> ClientResponse {
    let mut text = String::new();
    let mut finish_reason = None;
    let mut prompt_tokens = 0u32;
    let mut completion_tokens = 0u32;

    for delta in &deltas {
        if let Some(content) = &delta.content {
            if !content.is_empty() {
                text.push_str(content);
            }
        }
        if delta.finish_reason.is_some() {
            finish_reason = delta.finish_reason.clone();
        }
        prompt_tokens = prompt_tokens.max(delta.prompt_token_count.unwrap_or(0));
        completion_tokens = completion_tokens.max(delta.generation_len.unwrap_or(0));
    }

    ClientResponse {
        text,
        finish_reason,
        usage: Usage { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens },
        deltas,
    }
}
