//! Builds the presence payload for each kind of media

use url::Url;

use super::tracker::PublishPlan;
use super::traits::{ActivityKind, PayloadButton, PresencePayload};
use crate::i18n::{Localizer, MessageId};
use crate::session::{Clip, Episode, Media, Movie, Photo, SessionSnapshot, Track};
use crate::thumbnail::UNAVAILABLE_THUMB;

const ACTIVITY_NAME: &str = "Plex";
const NO_DIRECTORS: &str = "(⌐■_■)";
const PREROLL_TEXT: &str = "Preroll";

/// Deep-link key of a Plex GUID such as `plex://episode/5d9c086c46115600200aa2fe`
pub fn guid_key(guid: &str) -> String {
    if let Ok(url) = Url::parse(guid) {
        if let Some(segment) = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        {
            return segment.to_string();
        }
        if let Some(host) = url.host_str() {
            return host.to_string();
        }
    }

    guid.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
        .unwrap_or(guid)
        .to_string()
}

pub fn discover_link(guid: &str) -> String {
    format!(
        "https://app.plex.tv/desktop/#!/provider/tv.plex.provider.discover/details?key=/library/metadata/{}",
        guid_key(guid)
    )
}

pub fn search_link(query: &str) -> String {
    let encoded = url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>();
    format!("https://www.youtube.com/results?search_query={}", encoded)
}

pub fn build_payload(
    snapshot: &SessionSnapshot,
    plan: &PublishPlan,
    artwork: Option<&str>,
    localizer: &dyn Localizer,
) -> PresencePayload {
    let kind = match snapshot.media {
        Media::Track(_) => ActivityKind::Listening,
        _ => ActivityKind::Watching,
    };

    let mut payload = PresencePayload {
        name: ACTIVITY_NAME.to_string(),
        kind,
        details: None,
        details_url: None,
        state: None,
        state_url: None,
        large_image: artwork.unwrap_or(UNAVAILABLE_THUMB).to_string(),
        large_text: Some(ACTIVITY_NAME.to_string()),
        large_url: None,
        small_image: plan.small_image.map(str::to_string),
        small_text: None,
        timestamps: plan.timestamps,
        buttons: Vec::new(),
    };

    match &snapshot.media {
        Media::Episode(episode) => apply_episode(&mut payload, &snapshot.guid, episode, localizer),
        Media::Movie(movie) => apply_movie(&mut payload, &snapshot.guid, movie, localizer),
        Media::Track(track) => apply_track(&mut payload, &snapshot.guid, track, localizer),
        Media::Photo(photo) => apply_photo(&mut payload, photo, localizer),
        Media::Clip(clip) => apply_clip(&mut payload, clip),
        Media::Other => {}
    }

    payload
}

fn apply_episode(
    payload: &mut PresencePayload,
    guid: &str,
    episode: &Episode,
    localizer: &dyn Localizer,
) {
    let show_link = discover_link(&episode.grandparent_guid);

    payload.details = Some(episode.title.clone());
    payload.details_url = Some(discover_link(guid));
    payload.state = Some(episode.grandparent_title.clone());
    payload.state_url = Some(show_link.clone());
    payload.large_text = Some(format!(
        "Season {:02}, Episode {:02}",
        episode.parent_index, episode.index
    ));
    payload.buttons.push(PayloadButton {
        label: localizer.text(MessageId::ShowDetails),
        url: show_link,
    });
}

fn apply_movie(
    payload: &mut PresencePayload,
    guid: &str,
    movie: &Movie,
    localizer: &dyn Localizer,
) {
    let details_link = discover_link(guid);

    payload.details = Some(if movie.year > 0 {
        format!("{} ({})", movie.title, movie.year)
    } else {
        movie.title.clone()
    });
    payload.details_url = Some(details_link.clone());
    payload.state = Some(if movie.directors.is_empty() {
        NO_DIRECTORS.to_string()
    } else {
        movie.directors.join(", ")
    });
    payload.large_url = Some(details_link.clone());
    payload.buttons.push(PayloadButton {
        label: localizer.text(MessageId::MovieDetails),
        url: details_link,
    });
}

fn apply_track(
    payload: &mut PresencePayload,
    guid: &str,
    track: &Track,
    localizer: &dyn Localizer,
) {
    let artist = track.artist();
    let track_link = format!(
        "https://listen.plex.tv/track/{}?parentGuid={}&grandparentGuid={}",
        guid_key(guid),
        guid_key(&track.parent_guid),
        guid_key(&track.grandparent_guid)
    );

    payload.details = Some(track.title.clone());
    payload.details_url = Some(track_link.clone());
    payload.state = Some(artist.to_string());
    payload.state_url = Some(format!(
        "https://listen.plex.tv/artist/{}",
        guid_key(&track.grandparent_guid)
    ));
    payload.large_text = Some(track.parent_title.clone());
    payload.large_url = Some(track_link.clone());
    payload.buttons.push(PayloadButton {
        label: localizer.text(MessageId::TrackDetails),
        url: track_link,
    });
    payload.buttons.push(PayloadButton {
        label: localizer.text(MessageId::YoutubeSearch),
        url: search_link(&format!("{} {}", artist, track.title)),
    });
}

fn apply_photo(payload: &mut PresencePayload, photo: &Photo, localizer: &dyn Localizer) {
    let text = localizer.text(MessageId::WatchingPhotos);

    payload.details = Some(photo.title.clone());
    payload.state = Some(text.clone());
    payload.small_text = Some(text);
}

fn apply_clip(payload: &mut PresencePayload, clip: &Clip) {
    payload.state = Some(clip.title.clone());
    payload.small_text = Some(PREROLL_TEXT.to_string());
}
