use std::fmt;

/// Error type for storage operations
///
/// Stores catch these where they happen and hand a plain success flag to the
/// controller; the variants exist so the log line says what went wrong.
#[derive(Debug)]
pub enum StorageError {
    /// Media index error (rusqlite)
    Database(rusqlite::Error),
    /// Filesystem error
    Io(std::io::Error),
    /// JPEG encode or decode failure
    Image(image::ImageError),
    /// Locator that does not name a media row
    InvalidUri(String),
    /// Entry or file not found
    NotFound(String),
    /// Configuration could not be read or parsed
    Config(String),
    /// Android bridge failure
    Platform(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Database(e) => write!(f, "Database error: {}", e),
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Image(e) => write!(f, "Image error: {}", e),
            StorageError::InvalidUri(uri) => write!(f, "Invalid content uri: {}", uri),
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Config(msg) => write!(f, "Configuration error: {}", msg),
            StorageError::Platform(msg) => write!(f, "Platform error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<image::ImageError> for StorageError {
    fn from(e: image::ImageError) -> Self {
        StorageError::Image(e)
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(e: toml::de::Error) -> Self {
        StorageError::Config(e.to_string())
    }
}
