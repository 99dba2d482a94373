//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration only; nothing here changes while the service runs.
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! The command-line and environment tiers arrive together through
//! [`ConfigOverrides`] (clap reads both); this module layers them over the
//! TOML file and the compiled defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "SCOREARENA_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default external converter executable
pub const DEFAULT_CONVERTER_BIN: &str = "musescore";

/// Default upper bound for an uploaded notation file (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Configuration as read from the TOML file
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Folder holding `uploads/` and the CSV logs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Listen address
    #[serde(default)]
    pub host: Option<IpAddr>,

    /// Listen port
    #[serde(default)]
    pub port: Option<u16>,

    /// External converter executable (name on PATH or absolute path)
    #[serde(default)]
    pub converter_bin: Option<String>,

    /// Maximum accepted request body for uploads
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load the TOML config file
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// used. A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config file {}", path.display());
        Ok(config)
    }
}

/// Default config file location: `<config_dir>/scorearena/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scorearena")
        .join("config.toml")
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\scorearena
        dirs::data_local_dir()
            .map(|d| d.join("scorearena"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\scorearena"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/scorearena
        dirs::data_dir()
            .map(|d| d.join("scorearena"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/scorearena"))
    } else {
        // ~/.local/share/scorearena
        dirs::data_local_dir()
            .map(|d| d.join("scorearena"))
            .unwrap_or_else(|| PathBuf::from("./scorearena_data"))
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub converter_bin: Option<String>,
    pub max_upload_bytes: Option<usize>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_addr: SocketAddr,
    pub converter_bin: String,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl ServiceConfig {
    /// Layer overrides over the TOML file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Self {
        let root_folder = overrides
            .root_folder
            .or(toml.root_folder)
            .unwrap_or_else(default_root_folder);
        let host = overrides
            .host
            .or(toml.host)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        Self {
            root_folder,
            bind_addr: SocketAddr::new(host, port),
            converter_bin: overrides
                .converter_bin
                .or(toml.converter_bin)
                .unwrap_or_else(|| DEFAULT_CONVERTER_BIN.to_string()),
            max_upload_bytes: overrides
                .max_upload_bytes
                .or(toml.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        }
    }

    /// Directory holding uploaded notation files and converted artifacts
    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join("uploads")
    }

    /// Arena verdict log
    pub fn verdicts_csv(&self) -> PathBuf {
        self.root_folder.join("arena_verdicts.csv")
    }

    /// Single-track rating log
    pub fn ratings_csv(&self) -> PathBuf {
        self.root_folder.join("ratings.csv")
    }

    /// Track metadata log
    pub fn metadata_csv(&self) -> PathBuf {
        self.root_folder.join("metadata.csv")
    }

    /// Create the root folder and uploads directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        let uploads = self.uploads_dir();
        if !uploads.exists() {
            std::fs::create_dir_all(&uploads).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", uploads.display(), e))
            })?;
            info!("Created uploads directory: {}", uploads.display());
        }
        Ok(())
    }
}
