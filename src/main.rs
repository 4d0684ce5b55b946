//! Headless entry point: load config, auto-login, print the first listing.
//!
//! Usage: `sftp-media [REMOTE_PATH]`

use std::sync::Arc;

use sftp_media::cancel::CancelToken;
use sftp_media::config::{config_dir, ConfigStorage, LoadOutcome};
use sftp_media::playback::{is_audio_file, PlaybackCache, SystemPlayer};
use sftp_media::sftp::ListingRow;
use sftp_media::ssh::{ConnectSettings, SshConnector};
use sftp_media::vault::CredentialVault;
use sftp_media::worker::{spawn_worker, WorkerController};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("sftp-media: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let base = config_dir()?;
    std::fs::create_dir_all(&base)?;

    let storage = ConfigStorage::in_dir(&base);
    let (config, outcome) = storage.load_or_init().await?;

    sftp_media::init_logging(Some(&config.log_file_in(&base)))?;
    tracing::info!("Starting sftp-media (config at {:?})", storage.path());
    match outcome {
        LoadOutcome::Loaded => {}
        LoadOutcome::Created => tracing::info!("Wrote default config"),
        LoadOutcome::Recovered { moved_to, reason } => tracing::warn!(
            "Config file corrupted ({}); moved to {:?} and replaced with defaults",
            reason,
            moved_to
        ),
    }

    let vault = CredentialVault::new(config.key_file_in(&base), config.vault_file_in(&base));
    let connector = Arc::new(SshConnector::new(ConnectSettings::from(&config)));
    let cache = PlaybackCache::new(
        config.staging_dir_or_default(),
        None,
        Box::new(SystemPlayer::new(config.external_player.clone())),
    );
    let auto_login = config.auto_login;
    let controller = spawn_worker(connector, vault, cache, config);

    let result = browse(&controller, auto_login).await;
    controller.shutdown().await;
    result
}

async fn browse(controller: &WorkerController, auto_login: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !auto_login {
        println!("Auto-login is disabled; nothing to do.");
        return Ok(());
    }

    let Some(connected) = controller.auto_login(CancelToken::new()).await? else {
        println!("No saved server details. Save a profile first.");
        return Ok(());
    };
    let handle = &connected.handle;
    println!("Connected to {}:{} as {}", handle.host, handle.port, handle.username);

    let nav = match std::env::args().nth(1) {
        Some(path) => controller.list(path).await?,
        None => match connected.listing_error {
            Some(e) => return Err(e.into()),
            None => connected.navigation,
        },
    };

    println!("{}", nav.context.current_path);
    for row in &nav.rows {
        let playable = matches!(row, ListingRow::Entry(entry) if !entry.is_dir() && is_audio_file(&entry.name));
        if playable {
            println!("  {}  \u{266a}", row.label());
        } else {
            println!("  {}", row.label());
        }
    }
    Ok(())
}
