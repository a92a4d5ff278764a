//! Playback session snapshots as reported by the media server

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::presence::ConnectionProfile;

/// Player state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PlaybackState {
    Playing,
    Paused,
    Buffering,
    Stopped,
}

impl From<String> for PlaybackState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "buffering" => Self::Buffering,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Episode {
    pub title: String,
    /// Show title
    pub grandparent_title: String,
    pub grandparent_guid: String,
    pub grandparent_thumb: String,
    /// Episode number
    pub index: u32,
    /// Season number
    pub parent_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub title: String,
    pub year: i32,
    pub directors: Vec<String>,
    pub thumb: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Track {
    pub title: String,
    /// Track-level artist, set for compilations and features
    pub original_title: String,
    /// Album title
    pub parent_title: String,
    pub parent_guid: String,
    pub parent_thumb: String,
    /// Album artist
    pub grandparent_title: String,
    pub grandparent_guid: String,
}

impl Track {
    pub fn artist(&self) -> &str {
        if self.original_title.is_empty() {
            &self.grandparent_title
        } else {
            &self.original_title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub title: String,
}

/// Preroll or trailer played before the main item
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Clip {
    pub title: String,
}

/// What is being played, with the fields each kind carries
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Media {
    Episode(Episode),
    Movie(Movie),
    Track(Track),
    Photo(Photo),
    Clip(Clip),
    #[serde(other)]
    Other,
}

impl Media {
    pub fn is_photo(&self) -> bool {
        matches!(self, Self::Photo(_))
    }

    /// Source thumbnail identifier used as the large image, if this kind has one
    pub fn artwork_key(&self) -> Option<&str> {
        match self {
            Self::Episode(episode) => Some(&episode.grandparent_thumb),
            Self::Movie(movie) => Some(&movie.thumb),
            Self::Track(track) => Some(&track.parent_thumb),
            Self::Photo(_) | Self::Clip(_) | Self::Other => None,
        }
    }

    /// Video kinds use the widescreen profile so artwork is not cropped to a square
    pub fn profile(&self) -> ConnectionProfile {
        match self {
            Self::Episode(_) | Self::Movie(_) => ConnectionProfile::Widescreen,
            Self::Track(_) | Self::Photo(_) | Self::Clip(_) | Self::Other => {
                ConnectionProfile::Square
            }
        }
    }
}

/// One poll of the active media server session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSnapshot {
    /// Stable identity of the playing item
    pub guid: String,
    pub state: PlaybackState,
    #[serde(default)]
    pub view_offset_ms: u64,
    #[serde(default)]
    pub duration_ms: u64,
    pub media: Media,
}

impl SessionSnapshot {
    /// Elapsed offset, truncated to whole seconds
    pub fn progress(&self) -> Duration {
        Duration::from_secs(self.view_offset_ms / 1000)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Pull-based producer of session snapshots
#[async_trait]
pub trait SessionSource: Send {
    /// Next snapshot, or `None` once the source is exhausted
    async fn next_snapshot(&mut self) -> Option<SessionSnapshot>;
}

/// Reads one JSON snapshot per line from standard input
pub struct StdinSessionSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinSessionSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinSessionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionSource for StdinSessionSource {
    async fn next_snapshot(&mut self) -> Option<SessionSnapshot> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!("Failed to read session feed: {}", e);
                    return None;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_snapshot(&line) {
                Ok(snapshot) => return Some(snapshot),
                Err(e) => tracing::warn!("Skipping malformed session line: {}", e),
            }
        }
    }
}

pub fn parse_snapshot(line: &str) -> Result<SessionSnapshot, String> {
    serde_json::from_str(line).map_err(|e| format!("Failed to parse session snapshot: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episode_snapshot() {
        let snapshot = parse_snapshot(
            r#"{"guid":"plex://episode/abc","state":"playing","view_offset_ms":61500,"duration_ms":1800000,
                "media":{"type":"episode","title":"Pilot","grandparent_title":"Show X","index":1,"parent_index":2}}"#,
        )
        .unwrap();

        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.progress(), Duration::from_secs(61));
        assert_eq!(snapshot.duration(), Duration::from_secs(1800));
        match snapshot.media {
            Media::Episode(episode) => {
                assert_eq!(episode.title, "Pilot");
                assert_eq!(episode.parent_index, 2);
                assert!(episode.grandparent_thumb.is_empty());
            }
            other => panic!("unexpected media {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_and_state() {
        let snapshot = parse_snapshot(
            r#"{"guid":"x","state":"weird","media":{"type":"livetv","title":"News"}}"#,
        )
        .unwrap();

        assert_eq!(snapshot.state, PlaybackState::Stopped);
        assert_eq!(snapshot.media, Media::Other);
        assert_eq!(snapshot.media.profile(), ConnectionProfile::Square);
    }

    #[test]
    fn test_track_artist_fallback() {
        let mut track = Track {
            grandparent_title: "Album Artist".to_string(),
            ..Track::default()
        };
        assert_eq!(track.artist(), "Album Artist");

        track.original_title = "Featured".to_string();
        assert_eq!(track.artist(), "Featured");
    }

    #[test]
    fn test_malformed_line() {
        assert!(parse_snapshot("{not json").is_err());
    }
}
