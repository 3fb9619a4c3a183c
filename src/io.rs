//! Raster file loading and export.
//!
//! Everything decodable by the `image` crate loads; the layer model is a
//! single integer band, so color sources are collapsed to luma. 16-bit
//! grayscale keeps its native value domain, everything else widens from
//! 0–255. Errors surface as strings for the status line / CLI stderr.

use std::path::Path;

use image::DynamicImage;

use crate::layer::RasterLayer;

/// Decode `path` into a raster layer named after the file.
pub fn load_raster(path: &Path) -> Result<RasterLayer, String> {
    let img = image::open(path)
        .map_err(|e| format!("could not open '{}': {}", path.display(), e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    Ok(layer_from_image(name, img))
}

/// Collapse a decoded image to a single integer band.
pub fn layer_from_image(name: String, img: DynamicImage) -> RasterLayer {
    match img {
        // Native 16-bit band — keep full precision and domain.
        DynamicImage::ImageLuma16(gray) => {
            let (w, h) = gray.dimensions();
            RasterLayer::from_band(name, w, h, gray.into_raw())
        }
        // Everything else goes through 8-bit luma.
        other => {
            let gray = other.into_luma8();
            let (w, h) = gray.dimensions();
            let band = gray.into_raw().into_iter().map(u16::from).collect();
            RasterLayer::from_band(name, w, h, band)
        }
    }
}

/// Write a composited RGBA image as PNG.
pub fn save_png(img: &image::RgbaImage, path: &Path) -> Result<(), String> {
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("could not write '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    #[test]
    fn eight_bit_luma_widens_to_u16_band() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([5]));
        img.put_pixel(1, 0, Luma([200]));
        let layer = layer_from_image("g8".into(), DynamicImage::ImageLuma8(img));
        assert_eq!((layer.width(), layer.height()), (2, 1));
        assert_eq!(layer.value_domain(), (5, 200));
    }

    #[test]
    fn sixteen_bit_luma_keeps_native_domain() {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![100u16, 4095u16]).unwrap();
        let layer = layer_from_image("g16".into(), DynamicImage::ImageLuma16(img));
        assert_eq!(layer.value_domain(), (100, 4095));
    }

    #[test]
    fn rgb_collapses_to_luma() {
        let img = DynamicImage::new_rgb8(3, 2);
        let layer = layer_from_image("rgb".into(), img);
        assert_eq!((layer.width(), layer.height()), (3, 2));
        assert_eq!(layer.value_domain(), (0, 0)); // all-black → flat domain
    }
}
