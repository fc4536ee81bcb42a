use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use std::io::{Cursor, Write};

/// Encodes `image` as JPEG into `writer`
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn write_jpeg<W: Write>(
    image: &DynamicImage,
    quality: u8,
    writer: W,
) -> Result<(), image::ImageError> {
    let rgb = image.to_rgb8();
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
}

/// Decodes any supported image from memory
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Scaled-down WebP copy for the photo grids
pub fn webp_thumbnail(image: &DynamicImage, size: u32) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = thumbnail_dimensions(image.width(), image.height(), size);
    let thumb = image.resize(width, height, FilterType::Triangle);

    let mut buffer = Cursor::new(Vec::new());
    thumb.write_to(&mut buffer, ImageFormat::WebP)?;
    Ok(buffer.into_inner())
}

/// Fits `width` x `height` into a `max` x `max` box, keeping the aspect ratio
///
/// Images already inside the box keep their size.
pub fn thumbnail_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let ratio = (width as f32 / max as f32).max(height as f32 / max as f32);

    if ratio > 1.0 {
        let new_width = ((width as f32 / ratio) as u32).max(1);
        let new_height = ((height as f32 / ratio) as u32).max(1);
        (new_width, new_height)
    } else {
        (width, height)
    }
}
