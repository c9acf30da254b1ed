//! JSON messages exchanged on the REQ/REP management socket, the broadcast
//! events published on the event socket, and the topic conventions both
//! sockets use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `load_model` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "load_model")]
pub struct LoadModelRequest {
    pub requested_id: String,
    pub canonical_id: String,
    pub model_path: String,
    pub wait_for_completion: bool,
}

/// Capabilities reported back inside a successful `load_model` reply's
/// `data.load_model` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadModelData {
    #[serde(default)]
    pub capabilities: HashMap<String, Vec<i64>>,
}

/// `load_model` reply. `status` is the wire discriminant; `rejected` and
/// transport-level failures both surface as [`LoadModelStatus::Rejected`] to
/// the caller, which decides between `LOAD_REJECTED` and `ACTIVATION_FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadModelStatus {
    Ok,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadModelReply {
    pub status: LoadModelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LoadModelReplyData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadModelReplyData {
    pub load_model: LoadModelData,
}

/// `list_models` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "list_models")]
pub struct ListModelsRequest {}

/// One entry in a `list_models` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub requested_id: String,
    pub canonical_id: String,
    pub load_state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListModelsReplyData {
    pub list_models: ListModelsInner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListModelsInner {
    pub models: Vec<ModelSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListModelsReply {
    pub data: ListModelsReplyData,
}

/// Process health reported inside a telemetry event, used to learn the
/// engine's pid on first readiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub pid: u64,
}

/// The engine's periodic telemetry snapshot; the first one received after
/// spawn signals readiness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
    #[serde(default)]
    pub gpu_total_bytes: u64,
    #[serde(default)]
    pub gpu_reserved_bytes: u64,
}

impl Telemetry {
    /// Fraction of GPU memory reserved, in `[0.0, 1.0]`. `0.0` when the
    /// engine reports no GPU (`gpu_total_bytes == 0`).
    pub fn gpu_utilization(&self) -> f64 {
        if self.gpu_total_bytes == 0 {
            0.0
        } else {
            self.gpu_reserved_bytes as f64 / self.gpu_total_bytes as f64
        }
    }
}

/// `model_loaded` / `model_load_failed` event body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLoadedEvent {
    pub model_id: String,
    #[serde(default)]
    pub capabilities: HashMap<String, Vec<i64>>,
}

/// A parsed broadcast event: the name before the first NUL byte, and the
/// raw JSON body after it.
#[derive(Debug, Clone)]
pub struct ManagementEvent {
    pub name: String,
    pub body: serde_json::Value,
}

/// The fixed prefix every broadcast event topic starts with.
pub const EVENT_PREFIX: &str = "__PIE_EVENT__:";

/// Prefix the SUB socket filters on for a given response channel.
///
/// Responses for channel `c` are published as a single frame whose bytes
/// begin with this prefix, so a client only receives its own deltas.
pub fn response_topic(channel_id: u64) -> String {
    format!("resp:{channel_id:016x}:")
}

/// The topic prefix a named event is published under. The NUL byte is the
/// sole separator between event name and JSON body.
pub fn event_topic(event_name: &str) -> String {
    format!("{EVENT_PREFIX}{event_name}\0")
}

/// Parse a broadcast event frame's bytes after the `__PIE_EVENT__:` prefix
/// has already been stripped. Returns `None` if there is no NUL separator.
pub fn parse_event_body(after_prefix: &[u8]) -> Option<ManagementEvent> {
    let nul_pos = after_prefix.iter().position(|&b| b == 0)?;
    let name = std::str::from_utf8(&after_prefix[..nul_pos]).ok()?.to_owned();
    let body_bytes = &after_prefix[nul_pos + 1..];
    let body: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body_bytes).ok()?
    };
    Some(ManagementEvent { name, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_topic_is_fixed_width_hex() {
        let topic = response_topic(0xdead_beef);
        assert_eq!(topic, "resp:00000000deadbeef:");
    }

    #[test]
    fn gpu_utilization_divides_reserved_by_total() {
        let t = Telemetry { health: None, gpu_total_bytes: 100, gpu_reserved_bytes: 75 };
        assert_eq!(t.gpu_utilization(), 0.75);
    }

    #[test]
    fn gpu_utilization_is_zero_with_no_gpu() {
        let t = Telemetry { health: None, gpu_total_bytes: 0, gpu_reserved_bytes: 0 };
        assert_eq!(t.gpu_utilization(), 0.0);
    }

    #[test]
    fn load_model_reply_round_trips() {
        let reply = LoadModelReply { status: LoadModelStatus::Accepted, message: None, data: None };
        let json = serde_json::to_string(&reply).unwrap();
        let decoded: LoadModelReply = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.status, LoadModelStatus::Accepted);
    }

    #[test]
    fn event_topic_embeds_name_with_nul_separator() {
        let topic = event_topic("model_loaded");
        assert!(topic.starts_with("__PIE_EVENT__:model_loaded"));
        assert!(topic.ends_with('\0'));
    }

    #[test]
    fn parse_event_body_splits_on_first_nul() {
        let mut bytes = b"model_loaded\0".to_vec();
        bytes.extend_from_slice(br#"{"model_id":"llama-3"}"#);
        let event = parse_event_body(&bytes).unwrap();
        assert_eq!(event.name, "model_loaded");
        assert_eq!(event.body["model_id"], "llama-3");
    }

    #[test]
    fn parse_event_body_without_nul_returns_none() {
        assert!(parse_event_body(b"model_loaded-no-separator").is_none());
    }
}
