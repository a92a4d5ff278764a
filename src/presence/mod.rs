mod manager;
mod mapper;
mod publisher;
mod tracker;
mod traits;

pub use manager::{run_presence_loop, run_until_interrupted, LoopExit, PresenceBridge};
pub use mapper::{build_payload, discover_link, guid_key, search_link};
pub use publisher::PresencePublisher;
pub use tracker::{
    Alteration, ClearReason, Decision, PresenceState, PublishPlan, CAMERA_IMAGE, DRIFT_THRESHOLD,
};
pub use traits::{
    ActivityKind, ConnectionProfile, PayloadButton, PresenceConnection, PresencePayload,
    PresenceTransport, Timestamps, TransportError, SQUARE_APP_ID, WIDESCREEN_APP_ID,
};
