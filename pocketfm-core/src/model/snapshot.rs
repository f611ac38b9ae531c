//! Persisted session state: only the directory the user was looking at.

use crate::config::Config;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs as TokioFs;
use tracing::{debug, info};

const SNAPSHOT_FILE: &str = "session.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub location: Option<PathBuf>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn new(location: &Path) -> Self {
        Self {
            location: Some(location.to_path_buf()),
        }
    }

    pub fn default_path() -> Result<PathBuf, AppError> {
        Ok(Config::data_dir()?.join(SNAPSHOT_FILE))
    }

    /// Reads a snapshot; a missing file is an empty snapshot.
    pub async fn load_from(path: &Path) -> Result<Self, AppError> {
        match TokioFs::read_to_string(path).await {
            Ok(text) => {
                let snapshot: Self = toml::from_str(&text)?;
                debug!("Loaded session snapshot {:?}", snapshot.location);
                Ok(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(AppError::ConfigIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), AppError> {
        let io_err = |source| AppError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await.map_err(io_err)?;
        }

        TokioFs::write(path, toml::to_string(self)?)
            .await
            .map_err(io_err)?;

        info!("Saved session location {:?} to {}", self.location, path.display());
        Ok(())
    }

    /// The saved location, if it still names a directory.
    pub async fn usable_location(&self) -> Option<&Path> {
        let location = self.location.as_deref()?;
        TokioFs::metadata(location)
            .await
            .ok()
            .filter(std::fs::Metadata::is_dir)
            .map(|_| location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("state").join(SNAPSHOT_FILE);

        let snapshot = SessionSnapshot::new(dir.path());
        snapshot.save_to(&file).await.unwrap();

        let loaded = SessionSnapshot::load_from(&file).await.unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.usable_location().await, Some(dir.path()));
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = SessionSnapshot::load_from(&dir.path().join("none.toml")).await.unwrap();
        assert_eq!(loaded, SessionSnapshot::default());
    }

    #[tokio::test]
    async fn vanished_location_is_not_usable() {
        let dir = TempDir::new().unwrap();
        let snapshot = SessionSnapshot::new(&dir.path().join("deleted"));
        assert_eq!(snapshot.usable_location().await, None);
    }
}
