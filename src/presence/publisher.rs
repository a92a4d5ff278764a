//! Connection lifecycle for the presence transport

use super::traits::{ConnectionProfile, PresenceConnection, PresencePayload, PresenceTransport};

/// Owns at most one live connection and switches it between profiles
pub struct PresencePublisher<T: PresenceTransport> {
    transport: T,
    connection: Option<T::Connection>,
}

impl<T: PresenceTransport> PresencePublisher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            connection: None,
        }
    }

    pub fn connected_profile(&self) -> Option<ConnectionProfile> {
        self.connection.as_ref().map(PresenceConnection::profile)
    }

    /// Make sure the live connection uses `profile`, reconnecting if needed
    pub async fn ensure_profile(&mut self, profile: ConnectionProfile) {
        if let Some(connection) = self.connection.as_mut() {
            if connection.profile() == profile {
                if let Err(e) = connection.login().await {
                    tracing::warn!("Failed to log back in to Discord: {}", e);
                    self.connection = None;
                }
                return;
            }
        }

        self.teardown().await;

        match self.transport.connect(profile).await {
            Ok(connection) => {
                tracing::info!("Connected to Discord with {:?} profile", profile);
                self.connection = Some(connection);
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Discord: {}", e);
            }
        }
    }

    pub async fn publish(&mut self, payload: &PresencePayload) {
        let Some(connection) = self.connection.as_mut() else {
            tracing::debug!("No Discord connection, skipping activity update");
            return;
        };

        match connection.push(payload).await {
            Ok(()) => tracing::info!("Discord activity set"),
            Err(e) => {
                tracing::error!("An error occurred when setting the activity in Discord: {}", e);
                connection.logout().await;
                self.connection = None;
            }
        }
    }

    pub async fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if connection.is_logged_in() {
                connection.logout().await;
            }
        }
    }
}
