//! Discord Rich Presence transport using discord-sdk

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use discord_sdk::{
    activity::{ActivityBuilder, Assets, Button},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};

use crate::presence::{
    ConnectionProfile, PresenceConnection, PresencePayload, PresenceTransport, TransportError,
};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord rejects activities with more buttons than this
const MAX_BUTTONS: usize = 2;

/// Connects to the local Discord client over IPC
#[derive(Debug, Clone, Copy)]
pub struct DiscordTransport {
    widescreen_app_id: i64,
    square_app_id: i64,
}

impl DiscordTransport {
    pub fn new(widescreen_app_id: i64, square_app_id: i64) -> Self {
        Self {
            widescreen_app_id,
            square_app_id,
        }
    }

    pub fn app_id(&self, profile: ConnectionProfile) -> i64 {
        match profile {
            ConnectionProfile::Widescreen => self.widescreen_app_id,
            ConnectionProfile::Square => self.square_app_id,
        }
    }
}

#[async_trait]
impl PresenceTransport for DiscordTransport {
    type Connection = DiscordConnection;

    async fn connect(
        &self,
        profile: ConnectionProfile,
    ) -> Result<DiscordConnection, TransportError> {
        let app_id = self.app_id(profile);
        let session = DiscordSession::open(app_id).await?;

        Ok(DiscordConnection {
            profile,
            app_id,
            session: Some(session),
        })
    }
}

struct DiscordSession {
    discord: Discord,
    // Keeps the event spokes alive for the lifetime of the connection
    _wheel: Wheel,
}

impl DiscordSession {
    async fn open(app_id: i64) -> Result<Self, TransportError> {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| TransportError::Unavailable(format!("{:?}", e)))?;

        tracing::info!("Discord connecting with application {}...", app_id);

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                Err(TransportError::Disconnected(
                    "Discord connection closed".to_string(),
                ))
            } else {
                match &*user_spoke.0.borrow() {
                    UserState::Connected(user) => Ok(user.username.clone()),
                    UserState::Disconnected(err) => {
                        Err(TransportError::Disconnected(format!("{:?}", err)))
                    }
                }
            }
        })
        .await;

        match handshake {
            Ok(Ok(username)) => {
                tracing::info!("Discord Rich Presence connected as {}", username);
                Ok(Self {
                    discord,
                    _wheel: wheel,
                })
            }
            Ok(Err(e)) => {
                discord.disconnect().await;
                Err(e)
            }
            Err(_) => {
                discord.disconnect().await;
                Err(TransportError::HandshakeTimeout)
            }
        }
    }
}

/// One Discord IPC session bound to a single application id
pub struct DiscordConnection {
    profile: ConnectionProfile,
    app_id: i64,
    session: Option<DiscordSession>,
}

#[async_trait]
impl PresenceConnection for DiscordConnection {
    fn profile(&self) -> ConnectionProfile {
        self.profile
    }

    fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    async fn login(&mut self) -> Result<(), TransportError> {
        if self.session.is_none() {
            self.session = Some(DiscordSession::open(self.app_id).await?);
        }
        Ok(())
    }

    async fn push(&mut self, payload: &PresencePayload) -> Result<(), TransportError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| TransportError::Disconnected("logged out".to_string()))?;

        tracing::debug!("Sending {:?} activity", payload.kind);

        session
            .discord
            .update_activity(build_activity(payload))
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Push(format!("{:?}", e)))
    }

    async fn logout(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if let Err(e) = session.discord.clear_activity().await {
            tracing::debug!("Failed to clear Discord activity: {:?}", e);
        }
        session.discord.disconnect().await;
        tracing::info!("Discord Rich Presence disconnected");
    }
}

/// Activity sent over IPC for `payload`.
///
/// The discord-sdk builder has no setter for the activity type or for the
/// details/state links, so `payload.kind`, `details_url`, `state_url` and
/// `large_url` are not sent. Tracks still show as "Playing".
fn build_activity(payload: &PresencePayload) -> ActivityBuilder {
    let mut assets =
        Assets::default().large(payload.large_image.clone(), payload.large_text.clone());
    if let Some(small_image) = &payload.small_image {
        assets = assets.small(small_image.clone(), payload.small_text.clone());
    }

    let mut activity = ActivityBuilder::new().assets(assets);

    if let Some(details) = &payload.details {
        activity = activity.details(details.clone());
    }
    if let Some(state) = &payload.state {
        activity = activity.state(state.clone());
    }
    if let Some(timestamps) = payload.timestamps {
        activity = activity
            .start_timestamp(SystemTime::from(timestamps.start))
            .end_timestamp(SystemTime::from(timestamps.end));
    }
    for button in payload.buttons.iter().take(MAX_BUTTONS) {
        activity = activity.button(Button {
            label: button.label.clone(),
            url: button.url.clone(),
        });
    }

    activity
}
