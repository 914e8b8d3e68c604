//! chordvault-server - chord sheet resolution service
//!
//! Serves chord sheets and artist/song search results, resolving each
//! request through the local record store, the shared remote tier and the
//! live scraping sidecar.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chordvault_common::config::{
    default_config_path, load_toml_config, LoggingConfig, RootFolderInitializer,
    RootFolderResolver,
};
use chordvault_common::db::init::init_database;
use chordvault_common::{Clock, SystemClock};
use chordvault_server::config::ServiceSettings;
use chordvault_server::services::{
    FilesystemBlobStore, HttpPageFetcher, QueryCache, RecordStore, RemoteTierClient,
    ResolutionOrchestrator, ScraperClient, SqliteArtistDirectory, TierSet,
};
use chordvault_server::{build_router, AppState};

/// Command-line arguments for chordvault-server
#[derive(Parser, Debug)]
#[command(name = "chordvault-server")]
#[command(about = "Chord sheet resolution and caching service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(short, long, env = "CHORDVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides CHORDVAULT_PORT and TOML)
    #[arg(short, long)]
    port: Option<u16>,

    /// Root folder holding the database and remote tier
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", logging.level)));

    match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => Default::default(),
    };

    init_tracing(&toml_config.logging)?;

    // Build identification first, before any slow startup work
    info!(
        "Starting ChordVault server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        Some(path) => warn!("Config {} not found, using compiled defaults", path.display()),
        None => warn!("No config directory on this platform, using compiled defaults"),
    }

    // Root folder: CLI → ENV → TOML → OS default
    let root_folder = RootFolderResolver::new("chordvault-server")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    RootFolderInitializer::new(root_folder.clone())
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let settings = ServiceSettings::resolve(root_folder, args.port, &toml_config);
    info!("Root folder: {}", settings.root_folder.display());
    info!("Database: {}", settings.database_path.display());

    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let records = RecordStore::new(pool.clone(), clock.clone(), &settings.cache);
    let queries = QueryCache::new(pool.clone(), clock.clone(), &settings.cache);

    let blob_store = FilesystemBlobStore::new(&settings.remote_root)
        .await
        .with_context(|| format!("Failed to open remote tier at {}", settings.remote_root.display()))?;
    info!("Remote tier: {}", settings.remote_root.display());
    let remote = RemoteTierClient::new(Arc::new(blob_store), settings.remote_timeout);

    let fetcher = HttpPageFetcher::new(&settings.scraper)?;
    info!("Scraper sidecar: {}", fetcher.base_url());
    let fallback = ScraperClient::new(Arc::new(fetcher));

    let tiers = TierSet {
        records,
        queries,
        remote,
        directory: Arc::new(SqliteArtistDirectory::new(pool.clone())),
        fallback: Arc::new(fallback),
    };
    let orchestrator = Arc::new(ResolutionOrchestrator::new(
        tiers,
        clock,
        settings.scraper.timeout(),
    ));

    // No background scheduler: sweep once at startup, then on demand
    let removed = orchestrator.sweep_expired().await;
    info!("Startup sweep removed {} expired chord sheets", removed);

    let app = build_router(AppState::new(orchestrator));

    let addr = format!("127.0.0.1:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
