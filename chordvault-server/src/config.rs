//! Service settings resolution for chordvault-server
//!
//! Combines the bootstrap TOML, environment and command line into the
//! settings the server runs with. Priority for overridable values:
//! CLI → ENV → TOML → compiled default.

use std::path::PathBuf;
use std::time::Duration;

use chordvault_common::config::{
    CacheConfig, RootFolderInitializer, ScraperConfig, TomlConfig, DEFAULT_PORT,
};
use tracing::{info, warn};

/// Port override
pub const PORT_ENV: &str = "CHORDVAULT_PORT";

/// Scraper sidecar URL override
pub const SCRAPER_URL_ENV: &str = "CHORDVAULT_SCRAPER_URL";

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub remote_root: PathBuf,
    pub port: u16,
    pub cache: CacheConfig,
    pub remote_timeout: Duration,
    pub scraper: ScraperConfig,
}

impl ServiceSettings {
    pub fn resolve(root_folder: PathBuf, cli_port: Option<u16>, toml_config: &TomlConfig) -> Self {
        let initializer = RootFolderInitializer::new(root_folder.clone());
        let remote_root = toml_config
            .remote
            .root
            .clone()
            .unwrap_or_else(|| initializer.remote_root());

        let mut scraper = toml_config.scraper.clone();
        if let Some(url) = resolve_scraper_url() {
            scraper.base_url = url;
        }

        Self {
            database_path: initializer.database_path(),
            root_folder,
            remote_root,
            port: resolve_port(cli_port, toml_config),
            cache: toml_config.cache.clone(),
            remote_timeout: toml_config.remote.timeout(),
            scraper,
        }
    }
}

/// Resolve the listen port
///
/// An unparseable environment value is ignored with a warning.
pub fn resolve_port(cli_port: Option<u16>, toml_config: &TomlConfig) -> u16 {
    let env_port = match std::env::var(PORT_ENV) {
        Ok(raw) => match raw.trim().parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!("Ignoring invalid {}={:?}", PORT_ENV, raw);
                None
            }
        },
        Err(_) => None,
    };

    let sources: Vec<&str> = [
        cli_port.map(|_| "command line"),
        env_port.map(|_| "environment"),
        toml_config.port.map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Port found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(port) = cli_port.or(env_port).or(toml_config.port) {
        info!("Port {} loaded from {}", port, sources[0]);
        return port;
    }
    DEFAULT_PORT
}

fn resolve_scraper_url() -> Option<String> {
    std::env::var(SCRAPER_URL_ENV)
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}
