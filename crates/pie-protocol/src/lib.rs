//! Wire types and binary framing shared between the client and the engine
//! subprocess: request frames, layout segments, chat parameters, streamed
//! deltas, and the small set of management-socket JSON messages.

pub mod chat_params;
pub mod delta;
pub mod frame;
pub mod header;
pub mod layout;
pub mod management;

pub use chat_params::ChatParameters;
pub use delta::ClientDelta;
pub use frame::{build_frame, parse_frame, slice_blob, CapabilityBlob, FrameError, FrameRequest, PromptBlobs};
pub use header::{CapabilityRef, PromptMetadata, RequestHeader, RequestType};
pub use layout::{LayoutSegment, LayoutSegmentType, LAYOUT_SEGMENT_SIZE};
pub use management::{
    event_topic, parse_event_body, response_topic, Health, ListModelsReply, ListModelsRequest,
    LoadModelReply, LoadModelRequest, LoadModelStatus, ManagementEvent, ModelLoadedEvent,
    ModelSummary, Telemetry, EVENT_PREFIX,
};
