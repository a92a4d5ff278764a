use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Default application id for video kinds; Discord renders its artwork at 3:2
pub const WIDESCREEN_APP_ID: i64 = 981_509_069_309_354_054;
/// Default application id for everything else; artwork is cropped to a square
pub const SQUARE_APP_ID: i64 = 803_556_010_307_616_788;

/// Identity the transport connects under, chosen per media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionProfile {
    Widescreen,
    Square,
}

/// Verb shown in front of the activity name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Watching,
    Listening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadButton {
    pub label: String,
    pub url: String,
}

/// Everything the presence display shows for one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub name: String,
    pub kind: ActivityKind,
    /// Top line
    pub details: Option<String>,
    pub details_url: Option<String>,
    /// Subtitle line
    pub state: Option<String>,
    pub state_url: Option<String>,
    pub large_image: String,
    pub large_text: Option<String>,
    pub large_url: Option<String>,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    pub timestamps: Option<Timestamps>,
    pub buttons: Vec<PayloadButton>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Discord is not available: {0}")]
    Unavailable(String),

    #[error("Discord handshake timed out")]
    HandshakeTimeout,

    #[error("Discord disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to set activity: {0}")]
    Push(String),
}

/// Establishes connections to the presence display service
#[async_trait]
pub trait PresenceTransport: Send + Sync {
    type Connection: PresenceConnection;

    async fn connect(&self, profile: ConnectionProfile)
        -> Result<Self::Connection, TransportError>;
}

/// A live connection under a single profile
#[async_trait]
pub trait PresenceConnection: Send {
    fn profile(&self) -> ConnectionProfile;

    fn is_logged_in(&self) -> bool;

    /// Re-affirm the session; reconnects if it was logged out
    async fn login(&mut self) -> Result<(), TransportError>;

    async fn push(&mut self, payload: &PresencePayload) -> Result<(), TransportError>;

    async fn logout(&mut self);
}
