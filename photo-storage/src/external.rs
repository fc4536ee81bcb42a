use crate::content_uri::{ContentUri, VOLUME_EXTERNAL, VOLUME_EXTERNAL_PRIMARY};
use crate::encode::{decode, write_jpeg};
use crate::error::StorageError;
use crate::media_store::{MediaIndex, MediaValues, SortOrder};
use crate::models::{SharedStoragePhoto, JPEG_MIME_TYPE, PHOTO_EXTENSION};
use crate::sdk::sdk29_and_up;
use image::DynamicImage;
use std::io::{Read, Write};
use std::sync::Arc;

/// Photos stored in the shared media index
#[derive(Clone)]
pub struct ExternalStorage {
    index: Arc<dyn MediaIndex>,
    sdk_int: u32,
    quality: u8,
}

impl ExternalStorage {
    pub fn new(index: Arc<dyn MediaIndex>, sdk_int: u32, quality: u8) -> Self {
        Self {
            index,
            sdk_int,
            quality,
        }
    }

    pub fn index(&self) -> &Arc<dyn MediaIndex> {
        &self.index
    }

    /// Collection new photos are inserted into
    pub fn insert_collection(&self) -> ContentUri {
        sdk29_and_up(self.sdk_int, || ContentUri::images(VOLUME_EXTERNAL_PRIMARY))
            .unwrap_or_else(ContentUri::external_content_uri)
    }

    /// Collection listed by [`ExternalStorage::list`]
    pub fn query_collection(&self) -> ContentUri {
        sdk29_and_up(self.sdk_int, || ContentUri::images(VOLUME_EXTERNAL))
            .unwrap_or_else(ContentUri::external_content_uri)
    }

    /// Inserts `<name>.jpg` and writes the encoded image behind it
    ///
    /// The entry stays pending until every byte is written. If encoding or
    /// writing fails the entry is deleted again, so no empty record is left
    /// behind. Returns `false` on any failure.
    pub fn save(&self, name: &str, image: &DynamicImage) -> bool {
        let values = MediaValues {
            display_name: format!("{}{}", name, PHOTO_EXTENSION),
            mime_type: JPEG_MIME_TYPE.to_string(),
            width: image.width(),
            height: image.height(),
        };

        let uri = match self.index.insert(&self.insert_collection(), &values) {
            Ok(Some(uri)) => uri,
            Ok(None) => {
                log::error!("Could not create media entry for {}", values.display_name);
                return false;
            }
            Err(e) => {
                log::error!("Could not create media entry for {}: {}", values.display_name, e);
                return false;
            }
        };

        match self.write(&uri, image) {
            Ok(()) => {
                log::debug!("Saved shared photo {} at {}", values.display_name, uri);
                true
            }
            Err(e) => {
                log::error!("Could not write shared photo {}: {}", uri, e);
                self.roll_back(&uri);
                false
            }
        }
    }

    fn write(&self, uri: &ContentUri, image: &DynamicImage) -> Result<(), StorageError> {
        {
            let mut stream = self.index.open_output_stream(uri)?;
            write_jpeg(image, self.quality, &mut stream)?;
            stream.flush()?;
        }
        self.index.publish(uri)
    }

    fn roll_back(&self, uri: &ContentUri) {
        match self.index.delete(uri) {
            Ok(true) => log::info!("Removed incomplete media entry {}", uri),
            Ok(false) => log::warn!("Incomplete media entry {} was already gone", uri),
            Err(e) => log::error!("Could not remove incomplete media entry {}: {}", uri, e),
        }
    }

    /// Published photos in ascending id order
    pub fn list(&self) -> Vec<SharedStoragePhoto> {
        let rows = match self
            .index
            .query(&self.query_collection(), SortOrder::IdAscending)
        {
            Ok(Some(rows)) => rows,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Could not query shared photos: {}", e);
                return Vec::new();
            }
        };

        let base = ContentUri::external_content_uri();
        rows.into_iter()
            .map(|row| SharedStoragePhoto {
                id: row.id,
                display_name: row.display_name,
                width: row.width,
                height: row.height,
                content_uri: base.with_appended_id(row.id),
            })
            .collect()
    }

    /// Reads and decodes the bytes behind a listed photo
    pub fn load_image(&self, photo: &SharedStoragePhoto) -> Result<DynamicImage, StorageError> {
        let mut bytes = Vec::new();
        self.index
            .open_input_stream(&photo.content_uri)?
            .read_to_end(&mut bytes)?;
        Ok(decode(&bytes)?)
    }
}
