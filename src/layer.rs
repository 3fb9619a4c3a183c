//! Raster layer model: one integer band, its value domain, and the
//! single-value transparency set currently installed on it.

use image::RgbaImage;
use rayon::prelude::*;

/// One "make this pixel value fully (or partially) transparent" rule.
/// The transparency panel only ever installs records with
/// `percent_transparent == 100`, but the layer honors any percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparentPixel {
    pub pixel_value: i32,
    pub percent_transparent: u8,
}

pub struct RasterLayer {
    pub name: String,
    width: u32,
    height: u32,
    /// Raw band values, row-major. 8-bit sources are widened on load.
    band: Vec<u16>,
    /// Valid pixel-value domain, computed once at load.
    min_val: i32,
    max_val: i32,
    /// Installed single-value transparency rules (replaced wholesale on apply).
    transparency: Vec<TransparentPixel>,
    /// Bumped on every invalidation so cached textures can detect staleness.
    pub dirty_generation: u64,
    /// Lazily rebuilt composite; dropped by `invalidate()`.
    composite_cache: Option<RgbaImage>,
}

impl RasterLayer {
    /// Build a layer from a raw band, scanning it for the value domain.
    pub fn from_band(name: String, width: u32, height: u32, band: Vec<u16>) -> Self {
        debug_assert_eq!(band.len(), (width as usize) * (height as usize));
        let (min_val, max_val) = match (band.iter().min(), band.iter().max()) {
            (Some(&lo), Some(&hi)) => (lo as i32, hi as i32),
            _ => (0, 0), // empty band — degenerate domain, panel stays disabled
        };
        Self {
            name,
            width,
            height,
            band,
            min_val,
            max_val,
            transparency: Vec::new(),
            dirty_generation: 0,
            composite_cache: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(min_val, max_val)` of the band.
    pub fn value_domain(&self) -> (i32, i32) {
        (self.min_val, self.max_val)
    }

    pub fn transparency(&self) -> &[TransparentPixel] {
        &self.transparency
    }

    /// Drop the cached composite and bump the generation counter.
    pub fn invalidate(&mut self) {
        self.composite_cache = None;
        self.dirty_generation = self.dirty_generation.wrapping_add(1);
    }

    /// Replace the layer's single-value transparency set.
    pub fn set_transparency(&mut self, records: Vec<TransparentPixel>) {
        self.transparency = records;
    }

    /// Render the band to RGBA grayscale with the transparency rules applied.
    /// The result is cached until the next `invalidate()`.
    pub fn composite(&mut self) -> &RgbaImage {
        if self.composite_cache.is_none() {
            self.composite_cache = Some(self.render_composite());
        }
        self.composite_cache.as_ref().unwrap()
    }

    fn render_composite(&self) -> RgbaImage {
        if self.band.is_empty() || self.width == 0 {
            return RgbaImage::new(self.width, self.height);
        }

        // Per-value alpha lookup so the pixel loop is a plain index.
        let mut alpha = vec![255u8; u16::MAX as usize + 1];
        for rec in &self.transparency {
            if (0..=u16::MAX as i32).contains(&rec.pixel_value) {
                let pct = rec.percent_transparent.min(100) as u32;
                alpha[rec.pixel_value as usize] = (255 - (255 * pct) / 100) as u8;
            }
        }

        let span = (self.max_val - self.min_val).max(1) as u32;
        let min = self.min_val;
        let row_bytes = self.width as usize * 4;

        let mut out = vec![0u8; row_bytes * self.height as usize];
        out.par_chunks_mut(row_bytes)
            .zip(self.band.par_chunks(self.width as usize))
            .for_each(|(row_out, row_band)| {
                for (px, &v) in row_out.chunks_exact_mut(4).zip(row_band) {
                    // Stretch the value domain to 0..=255 for display.
                    let gray = (((v as i32 - min) as u32 * 255) / span).min(255) as u8;
                    px[0] = gray;
                    px[1] = gray;
                    px[2] = gray;
                    px[3] = alpha[v as usize];
                }
            });

        RgbaImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}
