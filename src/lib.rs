pub mod discord;
pub mod i18n;
pub mod logging;
pub mod presence;
pub mod session;
pub mod settings;
pub mod thumbnail;

use discord::DiscordTransport;
use i18n::Catalog;
use presence::{run_until_interrupted, LoopExit, PresenceBridge};
use session::StdinSessionSource;
use settings::{load_settings, AppSettings};
use thumbnail::PlexThumbnailUploader;

/// Read session snapshots from stdin and mirror them to Discord until EOF or Ctrl-C
pub async fn run() {
    let log_guard = logging::init_logging();

    let settings = load_settings().unwrap_or_else(|e| {
        tracing::warn!("{}, using default settings", e);
        AppSettings::default()
    });

    if settings.plex_token.is_empty() {
        tracing::warn!("No Plex token configured, artwork will not be available");
    }

    let catalog = Catalog::load_or_default(settings.locale_file.as_deref());

    let uploader = match PlexThumbnailUploader::new(
        &settings.plex_url,
        &settings.plex_token,
        &settings.upload_expiry,
    ) {
        Ok(uploader) => uploader,
        Err(e) => {
            tracing::error!("Failed to set up thumbnail uploads: {}", e);
            std::process::exit(1);
        }
    };

    let transport = DiscordTransport::new(settings.widescreen_app_id, settings.square_app_id);
    let mut bridge = PresenceBridge::new(transport, Box::new(uploader), Box::new(catalog));
    let mut source = StdinSessionSource::new();

    tracing::info!("Waiting for sessions from {}", settings.plex_url);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if run_until_interrupted(&mut bridge, &mut source, interrupt).await == LoopExit::Interrupted {
        // The stdin reader thread cannot be cancelled and would block runtime shutdown
        drop(log_guard);
        std::process::exit(0);
    }
}
