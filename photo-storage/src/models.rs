use crate::content_uri::ContentUri;
use crate::error::StorageError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File extension every private photo carries
pub const PHOTO_EXTENSION: &str = ".jpg";

/// MIME type written into the shared media index
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Name of the optional configuration file inside the data directory
pub const CONFIG_FILE_NAME: &str = "androidstorage.toml";

/// A photo in the app's private file area
///
/// Only exists in memory while listed; the file on disk is the record.
#[derive(Debug, Clone)]
pub struct InternalStoragePhoto {
    /// Filename including the `.jpg` extension
    pub name: String,
    pub image: DynamicImage,
}

/// A photo row from the shared media index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedStoragePhoto {
    pub id: i64,
    pub display_name: String,
    pub width: u32,
    pub height: u32,
    pub content_uri: ContentUri,
}

/// Where a captured photo goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageTier {
    Private,
    Shared,
}

impl StorageTier {
    /// Tier selected by the "private" switch
    pub fn from_switch(private_checked: bool) -> Self {
        if private_checked {
            StorageTier::Private
        } else {
            StorageTier::Shared
        }
    }
}

/// Configuration for both stores and the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// App-private directory holding the `.jpg` files
    pub files_dir: PathBuf,
    /// Directory backing the shared media index bytes
    pub media_dir: PathBuf,
    /// SQLite file holding the shared media rows
    pub media_db_path: PathBuf,
    /// Android API level used for version-dependent behaviour
    pub sdk_int: u32,
    /// JPEG quality for both stores
    pub jpeg_quality: u8,
    /// Columns in each photo grid
    pub grid_columns: u32,
    /// Longest edge of grid thumbnails, in pixels
    pub thumbnail_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::for_data_dir("./data")
    }
}

/// Values an `androidstorage.toml` may override
#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    media_dir: Option<PathBuf>,
    media_db_path: Option<PathBuf>,
    sdk_int: Option<u32>,
    jpeg_quality: Option<u8>,
    grid_columns: Option<u32>,
    thumbnail_size: Option<u32>,
}

impl StorageConfig {
    /// Default layout rooted at the app's data directory
    ///
    /// The shared media index lives in a subdirectory, which the private
    /// listing never returns because it only keeps regular files.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let files_dir = data_dir.as_ref().to_path_buf();
        let media_dir = files_dir.join("shared_media");
        Self {
            media_db_path: media_dir.join("external.db"),
            files_dir,
            media_dir,
            sdk_int: 33,
            jpeg_quality: 95,
            grid_columns: 3,
            thumbnail_size: 256,
        }
    }

    /// Defaults for `data_dir`, overridden by `androidstorage.toml` if present
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut config = Self::for_data_dir(&data_dir);
        let path = data_dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&path)?;
        config.apply_toml(&contents)?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn apply_toml(&mut self, contents: &str) -> Result<(), StorageError> {
        let overrides: ConfigOverrides = toml::from_str(contents)?;

        if let Some(media_dir) = overrides.media_dir {
            self.media_db_path = media_dir.join("external.db");
            self.media_dir = media_dir;
        }
        if let Some(db) = overrides.media_db_path {
            self.media_db_path = db;
        }
        if let Some(sdk) = overrides.sdk_int {
            self.sdk_int = sdk;
        }
        if let Some(quality) = overrides.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(StorageError::Config(format!(
                    "jpeg_quality must be within 1..=100, got {}",
                    quality
                )));
            }
            self.jpeg_quality = quality;
        }
        if let Some(columns) = overrides.grid_columns {
            self.grid_columns = columns.max(1);
        }
        if let Some(size) = overrides.thumbnail_size {
            self.thumbnail_size = size;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::for_data_dir("/tmp/app");
        assert_eq!(config.files_dir, PathBuf::from("/tmp/app"));
        assert_eq!(config.media_dir, PathBuf::from("/tmp/app/shared_media"));
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.grid_columns, 3);
    }

    #[test]
    fn test_toml_overrides() {
        let mut config = StorageConfig::for_data_dir("/tmp/app");
        config
            .apply_toml("sdk_int = 28\njpeg_quality = 80\nmedia_dir = \"/tmp/media\"")
            .unwrap();
        assert_eq!(config.sdk_int, 28);
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.media_db_path, PathBuf::from("/tmp/media/external.db"));
        // untouched
        assert_eq!(config.files_dir, PathBuf::from("/tmp/app"));
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let mut config = StorageConfig::default();
        assert!(config.apply_toml("jpeg_quality = 0").is_err());
        assert_eq!(config.jpeg_quality, 95);
    }

    #[test]
    fn test_load_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::load(dir.path()).unwrap();
        assert_eq!(config, StorageConfig::for_data_dir(dir.path()));
    }

    #[test]
    fn test_load_with_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "grid_columns = 4\n").unwrap();
        let config = StorageConfig::load(dir.path()).unwrap();
        assert_eq!(config.grid_columns, 4);
    }

    #[test]
    fn test_tier_from_switch() {
        assert_eq!(StorageTier::from_switch(true), StorageTier::Private);
        assert_eq!(StorageTier::from_switch(false), StorageTier::Shared);
    }
}
