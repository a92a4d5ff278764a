use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Translatable strings used in presence payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    ShowDetails,
    MovieDetails,
    TrackDetails,
    YoutubeSearch,
    WatchingPhotos,
}

impl MessageId {
    pub fn key(self) -> &'static str {
        match self {
            Self::ShowDetails => "ShowDetails",
            Self::MovieDetails => "MovieDetails",
            Self::TrackDetails => "TrackDetails",
            Self::YoutubeSearch => "YoutubeSearch",
            Self::WatchingPhotos => "WatchingPhotos",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            Self::ShowDetails => "Show details on Plex",
            Self::MovieDetails => "Movie details on Plex",
            Self::TrackDetails => "Track details on Plex",
            Self::YoutubeSearch => "Search on YouTube",
            Self::WatchingPhotos => "Watching photos",
        }
    }
}

pub trait Localizer: Send + Sync {
    fn localize(&self, id: MessageId, default_text: &str) -> String;

    fn text(&self, id: MessageId) -> String {
        self.localize(id, id.default_text())
    }
}

/// Message catalog loaded from a flat JSON object of `{ "MessageId": "text" }`
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let messages: HashMap<String, String> = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse message catalog: {}", e))?;
        Ok(Self { messages })
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        tracing::debug!("Loading message catalog from {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read message catalog: {}", e))?;
        Self::from_json(&contents)
    }

    /// Load the catalog if one is configured, falling back to built-in texts
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("{}, using default texts", e);
                Self::default()
            }
        }
    }
}

impl Localizer for Catalog {
    fn localize(&self, id: MessageId, default_text: &str) -> String {
        self.messages
            .get(id.key())
            .filter(|text| !text.is_empty())
            .cloned()
            .unwrap_or_else(|| default_text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_overrides_defaults() {
        let catalog =
            Catalog::from_json(r#"{"WatchingPhotos": "Regarde des photos", "ShowDetails": ""}"#)
                .unwrap();

        assert_eq!(catalog.text(MessageId::WatchingPhotos), "Regarde des photos");
        assert_eq!(catalog.text(MessageId::ShowDetails), "Show details on Plex");
        assert_eq!(catalog.text(MessageId::YoutubeSearch), "Search on YouTube");
    }

    #[test]
    fn test_missing_catalog_falls_back() {
        let catalog = Catalog::load_or_default(Some(Path::new("/nonexistent/catalog.json")));
        assert_eq!(catalog.text(MessageId::MovieDetails), "Movie details on Plex");
    }
}
