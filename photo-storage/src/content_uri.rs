use crate::error::StorageError;
use std::fmt;

const SCHEME: &str = "content://media/";
const IMAGES_SEGMENT: &str = "/images/media";

/// Volume that aggregates every external volume
pub const VOLUME_EXTERNAL: &str = "external";

/// Primary external volume, the insert target on API 29+
pub const VOLUME_EXTERNAL_PRIMARY: &str = "external_primary";

/// Opaque locator for a shared image collection or a single entry in it
///
/// Shaped like Android's `content://media/<volume>/images/media[/<id>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri(String);

impl ContentUri {
    /// Image collection of a volume
    pub fn images(volume: &str) -> Self {
        ContentUri(format!("{}{}{}", SCHEME, volume, IMAGES_SEGMENT))
    }

    /// `MediaStore.Images.Media.EXTERNAL_CONTENT_URI`
    pub fn external_content_uri() -> Self {
        Self::images(VOLUME_EXTERNAL)
    }

    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let parsed = ContentUri(uri.to_string());
        parsed.volume()?;
        Ok(parsed)
    }

    /// `ContentUris.withAppendedId`
    pub fn with_appended_id(&self, id: i64) -> Self {
        ContentUri(format!("{}/{}", self.0.trim_end_matches('/'), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Volume name, e.g. `external`
    pub fn volume(&self) -> Result<&str, StorageError> {
        let rest = self
            .0
            .strip_prefix(SCHEME)
            .ok_or_else(|| StorageError::InvalidUri(self.0.clone()))?;
        match rest.find(IMAGES_SEGMENT) {
            Some(idx) if idx > 0 => Ok(&rest[..idx]),
            _ => Err(StorageError::InvalidUri(self.0.clone())),
        }
    }

    /// Row id when the locator names a single entry
    pub fn id(&self) -> Option<i64> {
        let volume = self.volume().ok()?;
        let collection_len = SCHEME.len() + volume.len() + IMAGES_SEGMENT.len();
        self.0
            .get(collection_len..)?
            .strip_prefix('/')?
            .parse()
            .ok()
    }

    /// Locator of the collection this entry belongs to
    pub fn collection(&self) -> Result<ContentUri, StorageError> {
        Ok(Self::images(self.volume()?))
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_content_uri() {
        assert_eq!(
            ContentUri::external_content_uri().as_str(),
            "content://media/external/images/media"
        );
    }

    #[test]
    fn test_appended_id() {
        let uri = ContentUri::images(VOLUME_EXTERNAL_PRIMARY).with_appended_id(42);
        assert_eq!(uri.as_str(), "content://media/external_primary/images/media/42");
        assert_eq!(uri.id(), Some(42));
        assert_eq!(uri.volume().unwrap(), "external_primary");
        assert_eq!(uri.collection().unwrap(), ContentUri::images("external_primary"));
    }

    #[test]
    fn test_collection_has_no_id() {
        assert_eq!(ContentUri::external_content_uri().id(), None);
    }

    #[test]
    fn test_parse_rejects_foreign_uri() {
        assert!(ContentUri::parse("file:///sdcard/a.jpg").is_err());
        assert!(ContentUri::parse("content://media/images/media").is_err());
        assert!(ContentUri::parse("content://media/external/images/media/7").is_ok());
    }
}
