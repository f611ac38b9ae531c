//! src/config.rs
//! ============================================================================
//! # Config: Application Configuration Loader and Saver
//!
//! Manages the user-editable settings of the file manager. Settings are stored
//! as TOML under the platform config directory resolved with
//! [`directories`](https://docs.rs/directories).
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use bytesize::ByteSize;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::AppError;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "pocketfm";
const APPLICATION: &str = "PocketFM";

/// Order in which directory entries are returned by the lister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingOrder {
    /// Whatever order the filesystem yields.
    Native,

    /// Lexicographic by name.
    Name,

    /// Directories first, then lexicographic by name.
    #[default]
    DirsFirst,
}

/// What copy, move and rename do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Fail,

    Overwrite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    pub order: ListingOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileOpsConfig {
    /// Size of the streaming buffer used when copying file contents.
    pub buffer_size: usize,

    pub collision: CollisionPolicy,
}

impl Default for FileOpsConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            collision: CollisionPolicy::Fail,
        }
    }
}

/// Thumbnail cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Thumbnail width in pixels
    pub width: u32,

    /// Thumbnail height in pixels
    pub height: u32,

    /// Upper bound on decoded pixel bytes kept in memory
    pub max_bytes: ByteSize,

    /// Evict thumbnails not looked at for this long
    #[serde(with = "humantime_serde")]
    pub time_to_idle: Duration,

    /// Pending decode requests before new ones are deferred
    pub queue_depth: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 52,
            height: 52,
            max_bytes: ByteSize::mib(8),
            time_to_idle: Duration::from_secs(600), // 10 minutes
            queue_depth: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Directory for rolling log files (defaults to the project data dir)
    pub log_dir: Option<PathBuf>,

    /// Mirror log lines on stderr
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            stderr: false,
        }
    }
}

impl LoggingConfig {
    /// Resolved log directory.
    #[must_use]
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            Config::data_dir().map_or_else(|_| PathBuf::from("logs"), |dir| dir.join("logs"))
        })
    }
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Home directory; falls back to external storage, then the user's home.
    pub home: Option<PathBuf>,

    pub show_hidden: bool,

    pub show_thumbnails: bool,

    /// Opaque display setting, passed through to the collaborator.
    pub text_color: String,

    pub listing: ListingConfig,

    pub file_ops: FileOpsConfig,

    pub thumbnails: ThumbnailConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home: None,
            show_hidden: false,
            show_thumbnails: true,
            text_color: "white".to_string(),
            listing: ListingConfig::default(),
            file_ops: FileOpsConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads config from the platform config dir, creating it with defaults if
    /// it does not exist yet.
    pub async fn load() -> Result<Self, AppError> {
        let path = Self::config_path()?;
        if TokioFs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self, AppError> {
        info!("Loading config from {}", path.display());

        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|source| AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(toml::from_str(&text)?)
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> Result<(), AppError> {
        self.save_to(&Self::config_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), AppError> {
        info!("Saving config to {}", path.display());

        let io_err = |source| AppError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await.map_err(io_err)?;

        Ok(())
    }

    /// Home directory used by "reset home" and at session start.
    #[must_use]
    pub fn home_dir(&self) -> PathBuf {
        self.home
            .clone()
            .or_else(|| std::env::var_os("EXTERNAL_STORAGE").map(PathBuf::from))
            .or_else(|| UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("/"))
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> Result<PathBuf, AppError> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for state that is not configuration (session, logs).
    pub fn data_dir() -> Result<PathBuf, AppError> {
        Ok(Self::project_dirs()?.data_local_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs, AppError> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| AppError::Other("Could not determine config directory.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config {
            home: Some(PathBuf::from("/sdcard")),
            show_hidden: true,
            ..Config::default()
        };
        config.listing.order = ListingOrder::Name;
        config.file_ops.collision = CollisionPolicy::Overwrite;
        config.thumbnails.max_bytes = ByteSize::mib(2);

        config.save_to(&path).await.unwrap();
        let loaded = Config::load_from(&path).await.unwrap();

        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        TokioFs::write(&path, "show_hidden = true\n[thumbnails]\nwidth = 96\n")
            .await
            .unwrap();

        let loaded = Config::load_from(&path).await.unwrap();

        assert!(loaded.show_hidden);
        assert!(loaded.show_thumbnails);
        assert_eq!(loaded.thumbnails.width, 96);
        assert_eq!(loaded.thumbnails.height, 52);
        assert_eq!(loaded.listing.order, ListingOrder::DirsFirst);
    }

    #[tokio::test]
    async fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        TokioFs::write(&path, "show_hidden = \"maybe\"").await.unwrap();

        assert!(matches!(
            Config::load_from(&path).await,
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn explicit_home_wins() {
        let config = Config {
            home: Some(PathBuf::from("/mnt/card")),
            ..Config::default()
        };
        assert_eq!(config.home_dir(), PathBuf::from("/mnt/card"));
    }
}
