use base64::Engine;
use image::DynamicImage;
use photo_storage::encode::webp_thumbnail;
use photo_storage::{ExternalStorage, InternalStoragePhoto, SharedStoragePhoto};

/// One cell of a photo grid
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoTile {
    /// Filename for private photos, row id for shared ones
    pub key: String,
    pub label: String,
    pub data_url: Option<String>,
}

/// WebP thumbnail of `image` as a base64 data URL
pub fn thumbnail_data_url(image: &DynamicImage, size: u32) -> Option<String> {
    match webp_thumbnail(image, size) {
        Ok(bytes) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
            Some(format!("data:image/webp;base64,{}", b64))
        }
        Err(e) => {
            log::warn!("Thumbnail creation failed: {}", e);
            None
        }
    }
}

pub fn private_tiles(photos: &[InternalStoragePhoto], size: u32) -> Vec<PhotoTile> {
    photos
        .iter()
        .map(|photo| PhotoTile {
            key: photo.name.clone(),
            label: photo.name.clone(),
            data_url: thumbnail_data_url(&photo.image, size),
        })
        .collect()
}

/// Tiles for shared photos; unreadable entries keep a placeholder
pub fn shared_tiles(
    external: &ExternalStorage,
    photos: &[SharedStoragePhoto],
    size: u32,
) -> Vec<PhotoTile> {
    photos
        .iter()
        .map(|photo| {
            let data_url = match external.load_image(photo) {
                Ok(image) => thumbnail_data_url(&image, size),
                Err(e) => {
                    log::warn!("Could not load {}: {}", photo.content_uri, e);
                    None
                }
            };
            PhotoTile {
                key: photo.id.to_string(),
                label: format!("{} ({}×{})", photo.display_name, photo.width, photo.height),
                data_url,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use photo_storage::SqliteMediaIndex;
    use std::sync::Arc;

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([0, 120, 240])))
    }

    #[test]
    fn test_thumbnail_data_url() {
        let url = thumbnail_data_url(&test_image(), 16).unwrap();
        assert!(url.starts_with("data:image/webp;base64,"));
    }

    #[test]
    fn test_private_tiles() {
        let photos = vec![InternalStoragePhoto {
            name: "a.jpg".to_string(),
            image: test_image(),
        }];
        let tiles = private_tiles(&photos, 16);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].key, "a.jpg");
        assert!(tiles[0].data_url.is_some());
    }

    #[test]
    fn test_shared_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let index =
            SqliteMediaIndex::open(dir.path().join("external.db"), dir.path().join("media"))
                .unwrap();
        let external = ExternalStorage::new(Arc::new(index), 33, 95);
        assert!(external.save("shared", &test_image()));

        let photos = external.list();
        let tiles = shared_tiles(&external, &photos, 16);
        assert_eq!(tiles[0].key, photos[0].id.to_string());
        assert_eq!(tiles[0].label, "shared.jpg (40×20)");
        assert!(tiles[0].data_url.is_some());
    }
}
