//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. A missing or unreadable
//! file is never fatal: a warning is logged and compiled defaults apply.
//!
//! Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. `CHORDVAULT_ROOT_FOLDER`, then `CHORDVAULT_ROOT` environment variable
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "chordvault.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

const ENV_ROOT_FOLDER: &str = "CHORDVAULT_ROOT_FOLDER";
const ENV_ROOT: &str = "CHORDVAULT_ROOT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for database and remote-tier blobs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub scraper: ScraperConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Expiry and bound settings for the local tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of an unsaved chord sheet, measured from its timestamp
    #[serde(default = "default_sheet_ttl_days")]
    pub sheet_ttl_days: i64,

    /// Grace period after a sheet is un-saved
    #[serde(default = "default_soft_delete_grace_hours")]
    pub soft_delete_grace_hours: i64,

    /// Query result cache TTL
    #[serde(default = "default_query_ttl_minutes")]
    pub query_ttl_minutes: i64,

    /// Query result cache capacity (MAX_ITEMS)
    #[serde(default = "default_query_max_items")]
    pub query_max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sheet_ttl_days: default_sheet_ttl_days(),
            soft_delete_grace_hours: default_soft_delete_grace_hours(),
            query_ttl_minutes: default_query_ttl_minutes(),
            query_max_items: default_query_max_items(),
        }
    }
}

impl CacheConfig {
    pub fn sheet_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.sheet_ttl_days)
    }

    pub fn soft_delete_grace(&self) -> chrono::Duration {
        chrono::Duration::hours(self.soft_delete_grace_hours)
    }

    pub fn query_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.query_ttl_minutes)
    }
}

/// Remote (shared) tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Blob store root; defaults to `<root_folder>/remote`
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root: None,
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Live scraping collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the page-automation sidecar
    #[serde(default = "default_scraper_url")]
    pub base_url: String,

    #[serde(default = "default_scraper_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_scraper_url(),
            timeout_ms: default_scraper_timeout_ms(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sheet_ttl_days() -> i64 {
    7
}

fn default_soft_delete_grace_hours() -> i64 {
    24
}

fn default_query_ttl_minutes() -> i64 {
    24 * 60
}

fn default_query_max_items() -> usize {
    100
}

fn default_remote_timeout_ms() -> u64 {
    5_000
}

fn default_scraper_url() -> String {
    "http://127.0.0.1:5741".to_string()
}

fn default_scraper_timeout_ms() -> u64 {
    30_000
}

fn default_requests_per_second() -> u32 {
    2
}

/// Compiled-in fallbacks for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/chordvault
            dirs::data_local_dir()
                .map(|d| d.join("chordvault"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/chordvault"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("chordvault"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/chordvault"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("chordvault"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\chordvault"))
        } else {
            PathBuf::from("./chordvault_data")
        };

        Self {
            root_folder,
            log_level: default_log_level(),
            log_file: None,
            port: DEFAULT_PORT,
        }
    }
}

/// Default config file location (`~/.config/chordvault/chordvault.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chordvault").join("chordvault.toml"))
}

/// Load TOML bootstrap config
///
/// A missing file yields defaults with a warning; a file that exists but
/// does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    info!(module = %self.module_name, "Root folder from {}: {}", var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            info!(module = %self.module_name, "Root folder from TOML: {}", path.display());
            return path.clone();
        }

        let default = CompiledDefaults::for_current_platform().root_folder;
        info!(module = %self.module_name, "Root folder default: {}", default.display());
        default
    }
}

/// Prepares the root folder on disk
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Default blob store root for the remote tier
    pub fn remote_root(&self) -> PathBuf {
        self.root.join("remote")
    }
}
