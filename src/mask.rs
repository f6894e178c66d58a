//! Hair mask extraction from a segmentation model's class-label output.
//!
//! The pipeline is binarize → upscale → soften. The upscaled binary mask is
//! kept alongside the feathered one for consumers that want hard edges.

use std::sync::Arc;
use std::time::SystemTime;

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix2};

use crate::backend::ImageBackend;
use crate::error::{Error, Result};
use crate::types::Size;

/// Class index the face-parsing model assigns to hair.
pub const HAIR_CLASS_INDEX: i32 = 17;

/// Gaussian sigma, in pixels, used to feather the upscaled mask.
pub const MASK_BLUR_SIGMA: f32 = 10.0;

/// Output of one hair segmentation run, sized to the source image.
#[derive(Debug, Clone)]
pub struct HairSegmentationResult {
    pub image_size: Size,
    /// Feathered mask used for compositing.
    pub hair_mask: Arc<GrayImage>,
    /// Upscaled binary mask before blurring.
    pub original_hair_mask: Arc<GrayImage>,
    pub processed_at: SystemTime,
}

impl HairSegmentationResult {
    pub fn new(hair_mask: GrayImage, original_hair_mask: GrayImage) -> Self {
        Self {
            image_size: Size::from_dimensions(original_hair_mask.dimensions()),
            hair_mask: Arc::new(hair_mask),
            original_hair_mask: Arc::new(original_hair_mask),
            processed_at: SystemTime::now(),
        }
    }

    /// Fraction of pixels classified as hair, from the binary mask.
    pub fn coverage(&self) -> f64 {
        let total = self.original_hair_mask.len();
        if total == 0 {
            return 0.0;
        }
        let hair = self.original_hair_mask.iter().filter(|&&v| v > 0).count();
        hair as f64 / total as f64
    }
}

/// Reduce a model output tensor to a (height, width) label grid.
///
/// Leading singleton axes (batch, channel) are dropped.
pub fn label_grid(labels: ArrayD<i32>) -> Result<Array2<i32>> {
    let mut labels = labels;
    while labels.ndim() > 2 && labels.shape()[0] == 1 {
        labels = labels.index_axis_move(Axis(0), 0);
    }

    let shape = labels.shape().to_vec();
    let grid = labels
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::InvalidOutputFormat(format!("expected a 2-D label grid, got shape {shape:?}")))?;

    if grid.is_empty() {
        return Err(Error::InvalidOutputFormat("empty label grid".to_string()));
    }
    Ok(grid)
}

/// Binarize a label grid: `class` becomes 255, everything else 0.
pub fn binarize(labels: ArrayView2<'_, i32>, class: i32) -> Result<GrayImage> {
    let (height, width) = labels.dim();
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(Error::InvalidOutputFormat(format!(
                "label grid of {width}x{height} cannot form a mask"
            )))
        }
    };

    let mut data = Vec::new();
    data.try_reserve_exact(width * height)
        .map_err(|e| Error::BufferAllocationFailed(format!("{width}x{height} mask: {e}")))?;
    data.extend(labels.iter().map(|&label| if label == class { 255u8 } else { 0 }));

    GrayImage::from_raw(w, h, data)
        .ok_or_else(|| Error::BufferAllocationFailed(format!("{w}x{h} mask buffer size mismatch")))
}

/// Rescale a mask to `width` x `height` with independent X/Y factors.
///
/// Nearest-neighbour sampling keeps a binary mask binary.
pub fn upscale(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }
    imageops::resize(mask, width, height, FilterType::Nearest)
}

/// Feather a mask with a Gaussian blur.
pub fn soften(mask: &GrayImage, sigma: f32) -> GrayImage {
    imageops::blur(mask, sigma)
}

/// Run the full mask pipeline for an image of `image_size` (width, height),
/// scaling and feathering on `backend`.
pub fn extract_hair_mask(
    labels: ArrayD<i32>,
    image_size: (u32, u32),
    backend: &dyn ImageBackend,
) -> Result<HairSegmentationResult> {
    let (width, height) = image_size;
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage(format!("{width}x{height} image")));
    }

    let grid = label_grid(labels)?;
    let binary = binarize(grid.view(), HAIR_CLASS_INDEX)?;
    log::trace!(
        "hair mask {}x{} upscaled to {width}x{height}",
        binary.width(),
        binary.height()
    );

    let scaled = backend.scale_mask(&binary, width, height);
    let feathered = backend.gaussian_blur(&scaled, MASK_BLUR_SIGMA);

    Ok(HairSegmentationResult::new(feathered, scaled))
}
