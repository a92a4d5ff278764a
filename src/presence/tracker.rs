//! Turns noisy session polls into presence decisions

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::traits::Timestamps;
use crate::session::{PlaybackState, SessionSnapshot};
use crate::thumbnail::ThumbnailCache;

/// Largest end-time wobble still treated as the same uninterrupted playback
pub const DRIFT_THRESHOLD: Duration = Duration::from_secs(4);

/// Small image shown while browsing photos
pub const CAMERA_IMAGE: &str = "camera";

/// What changed during the last update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alteration {
    pub item: bool,
    pub time: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    Paused,
    NothingPlaying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub timestamps: Option<Timestamps>,
    pub small_image: Option<&'static str>,
    pub alteration: Alteration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Clear(ClearReason),
    Publish(PublishPlan),
}

/// State carried between consecutive snapshots of the single active session
#[derive(Debug, Default)]
pub struct PresenceState {
    playing_item: Option<SessionSnapshot>,
    play_state: Option<PlaybackState>,
    last_end: Option<DateTime<Utc>>,
    alteration: Alteration,
    pub thumbnail: ThumbnailCache,
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing_item(&self) -> Option<&SessionSnapshot> {
        self.playing_item.as_ref()
    }

    pub fn last_end(&self) -> Option<DateTime<Utc>> {
        self.last_end
    }

    pub fn update(&mut self, snapshot: &SessionSnapshot, now: DateTime<Utc>) -> Decision {
        self.alteration = Alteration::default();

        if self
            .playing_item
            .as_ref()
            .is_none_or(|item| item.guid != snapshot.guid)
        {
            self.playing_item = Some(snapshot.clone());
            self.alteration.item = true;
        }

        if self.play_state != Some(snapshot.state) {
            self.play_state = Some(snapshot.state);
            self.alteration.time = true;
        }

        let playing = matches!(
            snapshot.state,
            PlaybackState::Playing | PlaybackState::Buffering
        );

        if snapshot.state == PlaybackState::Paused && self.alteration.time {
            tracing::info!("Paused, closing connection to Discord");
            self.clear(ClearReason::Paused)
        } else if playing && !snapshot.media.is_photo() {
            let timestamps = self.track_timestamps(snapshot, now);
            Decision::Publish(PublishPlan {
                timestamps: Some(timestamps),
                small_image: None,
                alteration: self.alteration,
            })
        } else if snapshot.media.is_photo() {
            Decision::Publish(PublishPlan {
                timestamps: None,
                small_image: Some(CAMERA_IMAGE),
                alteration: self.alteration,
            })
        } else {
            tracing::info!("Nothing is playing, closing connection to Discord");
            self.clear(ClearReason::NothingPlaying)
        }
    }

    fn track_timestamps(&mut self, snapshot: &SessionSnapshot, now: DateTime<Utc>) -> Timestamps {
        let progress = chrono::Duration::from_std(snapshot.progress())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let duration = chrono::Duration::from_std(snapshot.duration())
            .unwrap_or_else(|_| chrono::Duration::zero());

        let start = now.checked_sub_signed(progress).unwrap_or(now);
        let end = start.checked_add_signed(duration).unwrap_or(start);

        let drifted = self.last_end.is_none_or(|last| {
            let delta = last.signed_duration_since(end).num_milliseconds();
            u128::from(delta.unsigned_abs()) > DRIFT_THRESHOLD.as_millis()
        });

        if drifted {
            tracing::info!("A seek or a media change was detected, updating state");
            self.alteration.time = true;
            self.last_end = Some(end);
        }

        Timestamps { start, end }
    }

    fn clear(&mut self, reason: ClearReason) -> Decision {
        self.playing_item = None;
        Decision::Clear(reason)
    }
}
