//! Decode, downscale and re-encode channel logos

use image::imageops::FilterType;
use image::{GenericImageView, ImageError, ImageFormat};
use std::io::Cursor;

/// Target size so that neither side exceeds `max_dimension`. Images already
/// within bounds keep their size; sides never drop below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let largest = width.max(height);
    if largest <= max_dimension || largest == 0 {
        return (width, height);
    }
    let scale = f64::from(max_dimension) / f64::from(largest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode any supported container and return lossless PNG bytes, scaled down
/// to fit `max_dimension`.
pub fn to_png(image_bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>, ImageError> {
    let mut img = image::load_from_memory(image_bytes)?;

    let (width, height) = img.dimensions();
    let (target_width, target_height) = scaled_dimensions(width, height, max_dimension);
    if (target_width, target_height) != (width, height) {
        img = img.resize_exact(target_width, target_height, FilterType::Nearest);
    }

    let mut png_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut png_bytes);
    img.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(png_bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(100, 50, 256), (100, 50));
        assert_eq!(scaled_dimensions(256, 256, 256), (256, 256));
        assert_eq!(scaled_dimensions(1024, 512, 256), (256, 128));
        assert_eq!(scaled_dimensions(300, 1000, 256), (77, 256));
        assert_eq!(scaled_dimensions(5000, 1, 256), (256, 1));
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let png = to_png(&sample_png(600, 300), 256).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (256, 128));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let png = to_png(&sample_png(40, 20), 256).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (40, 20));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(to_png(b"definitely not an image", 256).is_err());
    }
}
