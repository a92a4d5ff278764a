//! Artwork resolution: Plex thumbnail key to a publicly reachable image URL

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use url::Url;

/// Fallback image key, also the default large image of every payload
pub const UNAVAILABLE_THUMB: &str = "plex";

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const LITTERBOX_API_URL: &str = "https://litterbox.catbox.moe/resources/internals/api.php";

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("Couldn't get thumbnail from Plex: {0}")]
    Fetch(String),

    #[error("Couldn't read thumbnail from Plex: {0}")]
    Read(String),

    #[error("Error uploading image to litterbox: {0}")]
    Upload(String),

    #[error("Invalid Plex server URL: {0}")]
    InvalidServerUrl(#[from] url::ParseError),

    #[error("Plex server URL cannot carry a path: {0}")]
    UnsupportedServerUrl(String),
}

/// Fetches artwork for a thumbnail key and re-hosts it publicly
#[async_trait]
pub trait ThumbnailUploader: Send + Sync {
    async fn fetch_and_upload(&self, thumb_key: &str) -> Result<String, ThumbnailError>;
}

/// Single-entry memo of the last resolved thumbnail key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailCache {
    source_key: Option<String>,
    resolved: Option<String>,
}

impl ThumbnailCache {
    /// Cached URL for `thumb_key`, if it resolved successfully last time
    pub fn lookup(&self, thumb_key: &str) -> Option<&str> {
        if self.source_key.as_deref() != Some(thumb_key) {
            return None;
        }
        self.resolved
            .as_deref()
            .filter(|url| *url != UNAVAILABLE_THUMB)
    }

    pub fn source_key(&self) -> Option<&str> {
        self.source_key.as_deref()
    }
}

/// Resolve a thumbnail key, reusing the cached URL when the key is unchanged.
/// Failures are logged and degrade to [`UNAVAILABLE_THUMB`].
pub async fn resolve<U>(cache: &mut ThumbnailCache, thumb_key: &str, uploader: &U) -> String
where
    U: ThumbnailUploader + ?Sized,
{
    if thumb_key.is_empty() {
        return UNAVAILABLE_THUMB.to_string();
    }

    if let Some(url) = cache.lookup(thumb_key) {
        return url.to_string();
    }

    cache.source_key = Some(thumb_key.to_string());

    let resolved = match uploader.fetch_and_upload(thumb_key).await {
        Ok(url) => {
            tracing::debug!("Uploaded thumbnail {} to {}", thumb_key, url);
            url
        }
        Err(e) => {
            tracing::warn!("{}", e);
            UNAVAILABLE_THUMB.to_string()
        }
    };

    cache.resolved = Some(resolved.clone());
    resolved
}

/// Pulls a transcoded thumbnail from the Plex server and uploads it to litterbox
pub struct PlexThumbnailUploader {
    client: reqwest::Client,
    server_url: Url,
    upload_url: Url,
    token: String,
    expiry: String,
}

impl PlexThumbnailUploader {
    pub fn new(server_url: &str, token: &str, expiry: &str) -> Result<Self, ThumbnailError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ThumbnailError::Fetch(e.to_string()))?;

        let server_url = Url::parse(server_url)?;
        if server_url.cannot_be_a_base() {
            return Err(ThumbnailError::UnsupportedServerUrl(server_url.to_string()));
        }

        Ok(Self {
            client,
            server_url,
            upload_url: Url::parse(LITTERBOX_API_URL)?,
            token: token.to_string(),
            expiry: expiry.to_string(),
        })
    }

    /// Upload somewhere other than litterbox
    pub fn with_upload_url(mut self, upload_url: Url) -> Self {
        self.upload_url = upload_url;
        self
    }

    /// Transcode endpoint under the configured server URL, keeping any path prefix
    pub fn transcode_url(&self, thumb_key: &str) -> Result<Url, ThumbnailError> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|()| ThumbnailError::UnsupportedServerUrl(self.server_url.to_string()))?
            .pop_if_empty()
            .extend(["photo", ":", "transcode"]);
        url.query_pairs_mut()
            .append_pair("width", "450")
            .append_pair("height", "253")
            .append_pair("minSize", "1")
            .append_pair("upscale", "1")
            .append_pair("X-Plex-Token", &self.token)
            .append_pair("url", thumb_key);
        Ok(url)
    }

    async fn fetch(&self, thumb_key: &str) -> Result<Vec<u8>, ThumbnailError> {
        let response = self
            .client
            .get(self.transcode_url(thumb_key)?)
            .send()
            .await
            .map_err(|e| ThumbnailError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ThumbnailError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ThumbnailError::Read(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn upload(&self, bytes: Vec<u8>, thumb_key: &str) -> Result<String, ThumbnailError> {
        let part = Part::bytes(bytes).file_name(upload_file_name(thumb_key));
        let form = Form::new()
            .text("reqtype", "fileupload")
            .text("time", self.expiry.clone())
            .part("fileToUpload", part);

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ThumbnailError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ThumbnailError::Upload(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ThumbnailError::Upload(e.to_string()))?;

        parse_upload_response(&body)
    }
}

#[async_trait]
impl ThumbnailUploader for PlexThumbnailUploader {
    async fn fetch_and_upload(&self, thumb_key: &str) -> Result<String, ThumbnailError> {
        let bytes = self.fetch(thumb_key).await?;
        self.upload(bytes, thumb_key).await
    }
}

fn upload_file_name(thumb_key: &str) -> String {
    format!("{}.jpg", utf8_percent_encode(thumb_key, NON_ALPHANUMERIC))
}

fn parse_upload_response(body: &str) -> Result<String, ThumbnailError> {
    let body = body.trim();
    match Url::parse(body) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(body.to_string()),
        _ => Err(ThumbnailError::Upload(format!(
            "unexpected response: {}",
            body
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every key it is asked for, failing on the ones listed
    #[derive(Default)]
    struct FakeUploader {
        calls: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl ThumbnailUploader for FakeUploader {
        async fn fetch_and_upload(&self, thumb_key: &str) -> Result<String, ThumbnailError> {
            self.calls.lock().push(thumb_key.to_string());
            if self.failing.contains(&thumb_key) {
                return Err(ThumbnailError::Fetch("connection refused".to_string()));
            }
            Ok(format!("https://litter.catbox.moe/{}.jpg", thumb_key.len()))
        }
    }

    #[tokio::test]
    async fn test_same_key_is_fetched_once() {
        let uploader = FakeUploader::default();
        let mut cache = ThumbnailCache::default();

        let first = resolve(&mut cache, "/library/metadata/1/thumb/1", &uploader).await;
        let second = resolve(&mut cache, "/library/metadata/1/thumb/1", &uploader).await;

        assert_eq!(first, second);
        assert_eq!(uploader.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_changed_key_is_refetched() {
        let uploader = FakeUploader::default();
        let mut cache = ThumbnailCache::default();

        resolve(&mut cache, "/a", &uploader).await;
        resolve(&mut cache, "/bb", &uploader).await;
        resolve(&mut cache, "/a", &uploader).await;

        assert_eq!(uploader.calls.lock().as_slice(), ["/a", "/bb", "/a"]);
        assert_eq!(cache.source_key(), Some("/a"));
    }

    #[tokio::test]
    async fn test_failure_yields_sentinel_and_retries_next_time() {
        let uploader = FakeUploader {
            failing: vec!["/broken"],
            ..FakeUploader::default()
        };
        let mut cache = ThumbnailCache::default();

        assert_eq!(resolve(&mut cache, "/broken", &uploader).await, UNAVAILABLE_THUMB);
        assert_eq!(cache.source_key(), Some("/broken"));
        assert_eq!(cache.lookup("/broken"), None);

        assert_eq!(resolve(&mut cache, "/broken", &uploader).await, UNAVAILABLE_THUMB);
        assert_eq!(uploader.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_skips_io() {
        let uploader = FakeUploader::default();
        let mut cache = ThumbnailCache::default();

        assert_eq!(resolve(&mut cache, "", &uploader).await, UNAVAILABLE_THUMB);
        assert!(uploader.calls.lock().is_empty());
        assert_eq!(cache, ThumbnailCache::default());
    }

    #[test]
    fn test_transcode_url_keeps_path_prefix() {
        for base in ["https://example.com/plex", "https://example.com/plex/"] {
            let uploader = PlexThumbnailUploader::new(base, "tok", "1h").unwrap();
            let url = uploader.transcode_url("/library/metadata/1/thumb/2").unwrap();
            assert_eq!(url.path(), "/plex/photo/:/transcode", "base {}", base);
        }
    }

    #[test]
    fn test_transcode_url() {
        let uploader =
            PlexThumbnailUploader::new("http://192.168.1.10:32400", "tok en", "1h").unwrap();
        let url = uploader.transcode_url("/library/metadata/42/thumb/99").unwrap();

        assert_eq!(url.path(), "/photo/:/transcode");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("X-Plex-Token".to_string(), "tok en".to_string())));
        assert!(pairs.contains(&(
            "url".to_string(),
            "/library/metadata/42/thumb/99".to_string()
        )));
        assert!(pairs.contains(&("width".to_string(), "450".to_string())));
    }

    #[test]
    fn test_parse_upload_response() {
        assert_eq!(
            parse_upload_response("https://litter.catbox.moe/abc.jpg\n").unwrap(),
            "https://litter.catbox.moe/abc.jpg"
        );
        assert!(parse_upload_response("File too large").is_err());
        assert!(parse_upload_response("").is_err());
    }

    #[test]
    fn test_upload_file_name_is_flat() {
        let name = upload_file_name("/library/metadata/42/thumb/99");
        assert!(!name.contains('/'));
        assert!(name.ends_with(".jpg"));
    }

    mod http {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        const THUMB_KEY: &str = "/library/metadata/7/thumb/8";

        fn uploader_for(server: &MockServer, base_path: &str) -> PlexThumbnailUploader {
            let upload_url = Url::parse(&format!("{}/api.php", server.uri())).unwrap();
            PlexThumbnailUploader::new(&format!("{}{}", server.uri(), base_path), "tok", "1h")
                .unwrap()
                .with_upload_url(upload_url)
        }

        async fn mount_thumbnail(server: &MockServer, transcode_path: &str) {
            Mock::given(method("GET"))
                .and(path(transcode_path))
                .and(query_param("X-Plex-Token", "tok"))
                .and(query_param("url", THUMB_KEY))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
                .mount(server)
                .await;
        }

        async fn mount_upload(server: &MockServer, response: ResponseTemplate) {
            Mock::given(method("POST"))
                .and(path("/api.php"))
                .respond_with(response)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_uploaded_url_is_returned_and_cached() {
            let server = MockServer::start().await;
            mount_thumbnail(&server, "/photo/:/transcode").await;
            mount_upload(
                &server,
                ResponseTemplate::new(200).set_body_string("https://litter.catbox.moe/abc.jpg"),
            )
            .await;
            let uploader = uploader_for(&server, "");
            let mut cache = ThumbnailCache::default();

            let url = resolve(&mut cache, THUMB_KEY, &uploader).await;

            assert_eq!(url, "https://litter.catbox.moe/abc.jpg");
            assert_eq!(cache.lookup(THUMB_KEY), Some("https://litter.catbox.moe/abc.jpg"));
        }

        #[tokio::test]
        async fn test_server_path_prefix_is_used_for_fetch() {
            let server = MockServer::start().await;
            mount_thumbnail(&server, "/plex/photo/:/transcode").await;
            mount_upload(
                &server,
                ResponseTemplate::new(200).set_body_string("https://litter.catbox.moe/p.jpg"),
            )
            .await;
            let uploader = uploader_for(&server, "/plex");
            let mut cache = ThumbnailCache::default();

            assert_eq!(
                resolve(&mut cache, THUMB_KEY, &uploader).await,
                "https://litter.catbox.moe/p.jpg"
            );
        }

        #[tokio::test]
        async fn test_missing_thumbnail_falls_back() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/photo/:/transcode"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
            mount_upload(
                &server,
                ResponseTemplate::new(200).set_body_string("https://litter.catbox.moe/x.jpg"),
            )
            .await;
            let uploader = uploader_for(&server, "");
            let mut cache = ThumbnailCache::default();

            assert!(matches!(
                uploader.fetch_and_upload(THUMB_KEY).await,
                Err(ThumbnailError::Fetch(_))
            ));
            assert_eq!(resolve(&mut cache, THUMB_KEY, &uploader).await, UNAVAILABLE_THUMB);
        }

        #[tokio::test]
        async fn test_upload_server_error_falls_back() {
            let server = MockServer::start().await;
            mount_thumbnail(&server, "/photo/:/transcode").await;
            mount_upload(&server, ResponseTemplate::new(500)).await;
            let uploader = uploader_for(&server, "");
            let mut cache = ThumbnailCache::default();

            assert!(matches!(
                uploader.fetch_and_upload(THUMB_KEY).await,
                Err(ThumbnailError::Upload(_))
            ));
            assert_eq!(resolve(&mut cache, THUMB_KEY, &uploader).await, UNAVAILABLE_THUMB);
        }

        #[tokio::test]
        async fn test_upload_error_body_falls_back() {
            let server = MockServer::start().await;
            mount_thumbnail(&server, "/photo/:/transcode").await;
            mount_upload(
                &server,
                ResponseTemplate::new(200).set_body_string("File too large"),
            )
            .await;
            let uploader = uploader_for(&server, "");
            let mut cache = ThumbnailCache::default();

            assert_eq!(resolve(&mut cache, THUMB_KEY, &uploader).await, UNAVAILABLE_THUMB);
            assert_eq!(cache.lookup(THUMB_KEY), None);
        }
    }
}
