//! Drives presence updates from incoming session snapshots

use std::future::Future;

use chrono::Utc;

use super::mapper::build_payload;
use super::publisher::PresencePublisher;
use super::tracker::{Decision, PresenceState};
use super::traits::PresenceTransport;
use crate::i18n::Localizer;
use crate::session::{SessionSnapshot, SessionSource};
use crate::thumbnail::{self, ThumbnailUploader};

/// Bridges one media session to the presence display
pub struct PresenceBridge<T: PresenceTransport> {
    state: PresenceState,
    publisher: PresencePublisher<T>,
    uploader: Box<dyn ThumbnailUploader>,
    localizer: Box<dyn Localizer>,
}

impl<T: PresenceTransport> PresenceBridge<T> {
    pub fn new(
        transport: T,
        uploader: Box<dyn ThumbnailUploader>,
        localizer: Box<dyn Localizer>,
    ) -> Self {
        Self {
            state: PresenceState::new(),
            publisher: PresencePublisher::new(transport),
            uploader,
            localizer,
        }
    }

    pub fn publisher(&self) -> &PresencePublisher<T> {
        &self.publisher
    }

    /// Apply a new snapshot: clear the presence or publish an updated one
    pub async fn apply(&mut self, snapshot: &SessionSnapshot) {
        let plan = match self.state.update(snapshot, Utc::now()) {
            Decision::Clear(reason) => {
                tracing::debug!("Clearing presence: {:?}", reason);
                self.publisher.teardown().await;
                return;
            }
            Decision::Publish(plan) => plan,
        };

        self.publisher.ensure_profile(snapshot.media.profile()).await;

        let artwork = match snapshot.media.artwork_key() {
            Some(key) => Some(
                thumbnail::resolve(&mut self.state.thumbnail, key, self.uploader.as_ref()).await,
            ),
            None => None,
        };

        let payload = build_payload(snapshot, &plan, artwork.as_deref(), self.localizer.as_ref());
        tracing::debug!("Updating presence: {:?}", payload);

        self.publisher.publish(&payload).await;
    }

    pub async fn shutdown(&mut self) {
        self.publisher.teardown().await;
    }
}

/// Feed every snapshot from `source` into the bridge until the source ends
pub async fn run_presence_loop<T, S>(bridge: &mut PresenceBridge<T>, source: &mut S)
where
    T: PresenceTransport,
    S: SessionSource + ?Sized,
{
    while let Some(snapshot) = source.next_snapshot().await {
        bridge.apply(&snapshot).await;
    }

    tracing::info!("Session feed ended");
    bridge.shutdown().await;
}

/// How [`run_until_interrupted`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    FeedEnded,
    Interrupted,
}

/// Run the presence loop until the feed ends or `interrupt` resolves.
/// The connection is torn down either way.
pub async fn run_until_interrupted<T, S, F>(
    bridge: &mut PresenceBridge<T>,
    source: &mut S,
    interrupt: F,
) -> LoopExit
where
    T: PresenceTransport,
    S: SessionSource + ?Sized,
    F: Future<Output = ()>,
{
    let exit = tokio::select! {
        () = run_presence_loop(bridge, source) => LoopExit::FeedEnded,
        () = interrupt => {
            tracing::info!("Interrupted, shutting down");
            LoopExit::Interrupted
        }
    };

    bridge.shutdown().await;
    exit
}
