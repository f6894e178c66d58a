//! Image-processing backend used by the filter engine.
//!
//! The engine only talks to [`ImageBackend`]; [`CpuBackend`] is the portable
//! implementation. A backend is probed once when the engine is built.

use image::imageops::{self, FilterType};
use image::{GrayImage, Rgba, RgbaImage};

use crate::color::{self, Adjustment, Rgb};
use crate::error::{Error, Result};
use crate::types::Point;
use crate::warp;

pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Check that the backend can run. Called once at engine construction.
    fn probe(&self) -> Result<()>;

    /// Resize with independent X/Y factors.
    fn scale(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage;

    /// Resize a mask with independent X/Y factors. Must not introduce new
    /// values, so a binary mask stays binary.
    fn scale_mask(&self, mask: &GrayImage, width: u32, height: u32) -> GrayImage;

    /// Feather a mask.
    fn gaussian_blur(&self, mask: &GrayImage, sigma: f32) -> GrayImage;

    fn adjust(&self, image: &RgbaImage, adjustment: &Adjustment) -> RgbaImage;

    /// Per-pixel `foreground * m + background * (1 - m)` with `m = mask / 255`.
    fn blend_with_mask(
        &self,
        foreground: &RgbaImage,
        background: &RgbaImage,
        mask: &GrayImage,
    ) -> Result<RgbaImage>;

    fn head_size_warp(
        &self,
        image: &RgbaImage,
        center: Point,
        radius_a: f64,
        radius_b: f64,
        strength: f64,
        angle: f64,
    ) -> RgbaImage;

    fn hair_color_grade(&self, image: &RgbaImage, target: Rgb, strength: f32) -> RgbaImage;
}

/// Pure-Rust backend built on the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn probe(&self) -> Result<()> {
        let probe = RgbaImage::from_pixel(2, 2, Rgba([128, 64, 32, 255]));
        let mask = GrayImage::from_pixel(2, 2, image::Luma([255]));
        let blended = self.blend_with_mask(&probe, &probe, &mask)?;
        if blended != probe {
            return Err(Error::BackendUnavailable(
                "cpu backend failed its self test".to_string(),
            ));
        }
        Ok(())
    }

    fn scale(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if image.dimensions() == (width, height) {
            return image.clone();
        }
        imageops::resize(image, width, height, FilterType::Triangle)
    }

    fn scale_mask(&self, mask: &GrayImage, width: u32, height: u32) -> GrayImage {
        crate::mask::upscale(mask, width, height)
    }

    fn gaussian_blur(&self, mask: &GrayImage, sigma: f32) -> GrayImage {
        crate::mask::soften(mask, sigma)
    }

    fn adjust(&self, image: &RgbaImage, adjustment: &Adjustment) -> RgbaImage {
        adjustment.apply(image)
    }

    fn blend_with_mask(
        &self,
        foreground: &RgbaImage,
        background: &RgbaImage,
        mask: &GrayImage,
    ) -> Result<RgbaImage> {
        if foreground.dimensions() != background.dimensions() {
            return Err(Error::InvalidImage(format!(
                "cannot blend {:?} over {:?}",
                foreground.dimensions(),
                background.dimensions()
            )));
        }

        let (width, height) = background.dimensions();
        let resized;
        let mask = if mask.dimensions() == (width, height) {
            mask
        } else {
            log::debug!(
                "[cpu] resizing mask {:?} to {width}x{height} for blending",
                mask.dimensions()
            );
            resized = imageops::resize(mask, width, height, FilterType::Triangle);
            &resized
        };

        let mut out = background.clone();
        for ((o, f), m) in out.pixels_mut().zip(foreground.pixels()).zip(mask.pixels()) {
            let m = m[0] as u32;
            for c in 0..4 {
                o[c] = blend_channel(f[c], o[c], m);
            }
        }
        Ok(out)
    }

    fn head_size_warp(
        &self,
        image: &RgbaImage,
        center: Point,
        radius_a: f64,
        radius_b: f64,
        strength: f64,
        angle: f64,
    ) -> RgbaImage {
        warp::head_size_warp(image, center, radius_a, radius_b, strength, angle)
    }

    fn hair_color_grade(&self, image: &RgbaImage, target: Rgb, strength: f32) -> RgbaImage {
        if strength <= 0.0 {
            return image.clone();
        }
        color::map_rgb(image, |c| color::grade_toward(c, target, strength))
    }
}

/// Exact at both ends: mask 0 yields `background`, 255 yields `foreground`.
#[inline]
fn blend_channel(foreground: u8, background: u8, mask: u32) -> u8 {
    ((foreground as u32 * mask + background as u32 * (255 - mask) + 127) / 255) as u8
}
