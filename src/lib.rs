//! # portrait-fx
//!
//! Detection-driven portrait filters in pure Rust.
//!
//! This crate provides:
//! - **Face Geometry**: landmark coordinate mapping and cheap order-based
//!   estimates of eye center, face radii and head roll
//! - **Hair Masks**: class-label output from a segmentation model turned into
//!   a feathered mask at image resolution
//! - **Filters**: a fixed taxonomy of size and hair filters, dispatched by
//!   category and composited through the hair mask
//! - **Orchestration**: concurrent detector invocation and a single-photo edit
//!   session that always re-renders from the original
//!
//! ## Pipeline
//!
//! 1. Pick a [`FilterConfiguration`]; its [`FilterCategory`] says which
//!    detection it needs (face landmarks for Sizes, a hair mask for Hair)
//! 2. [`DetectionOrchestrator`] runs the required detectors and returns a
//!    [`DetectionData`]
//! 3. [`FilterEngine::apply_filter`] warps the head around the primary face,
//!    or color-adjusts the whole image and blends it back through the mask
//! 4. Missing detection makes a filter a no-op, never an error
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use portrait_fx::{
//!     DetectionData, FilterConfiguration, FilterEngine, FilterType, HairSegmentationResult,
//! };
//! use image::{GrayImage, Luma, Rgba, RgbaImage};
//!
//! let engine = FilterEngine::cpu().unwrap();
//! let image = RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 90, 255]));
//!
//! // A hair mask, normally produced by a SegmentationWorker
//! let mask = GrayImage::from_fn(64, 64, |_, y| Luma([if y < 32 { 255 } else { 0 }]));
//! let hair = DetectionData::HairSegmentation(Arc::new(HairSegmentationResult::new(
//!     mask.clone(),
//!     mask,
//! )));
//!
//! let config = FilterConfiguration::new(FilterType::HairColorAuburn, 0.8);
//! let output = engine.apply_filter(&image, &config, Some(&hair)).unwrap();
//!
//! // Only the masked half changed
//! assert_eq!(output.get_pixel(10, 60), image.get_pixel(10, 60));
//! ```
//!
//! ## Custom Detectors
//!
//! Implement [`FaceLandmarkDetector`] for your landmark model and
//! [`SegmentationModel`] for your face-parsing model:
//!
//! ```rust
//! use portrait_fx::{Result, SegmentationModel};
//! use image::RgbImage;
//! use ndarray::{Array, ArrayD, IxDyn};
//!
//! struct NoHair;
//!
//! impl SegmentationModel for NoHair {
//!     fn predict(&mut self, input: &RgbImage) -> Result<ArrayD<i32>> {
//!         let (w, h) = input.dimensions();
//!         Ok(Array::zeros(IxDyn(&[h as usize, w as usize])))
//!     }
//! }
//! ```

mod backend;
mod color;
mod detection;
mod engine;
mod error;
mod estimator;
mod filter;
mod geometry;
mod landmarks;
mod mask;
mod overlay;
mod photo;
mod segmentation;
mod session;
mod types;
mod warp;

pub use backend::{CpuBackend, ImageBackend};
pub use color::{Adjustment, Rgb, NEUTRAL_TEMPERATURE};
pub use detection::{DetectionData, DetectionOrchestrator, FaceLandmarkDetector, HairSegmenter};
pub use engine::{
    hair_color_strength, hair_transform, FilterEngine, HairTransform, HEAD_RADIUS_A_SCALE,
    HEAD_RADIUS_B_SCALE, HEAD_SIZE_STRENGTH,
};
pub use error::{Error, Result};
pub use estimator::{eye_center, face_radii, head_angle, normalize_angle, FaceParameters};
pub use filter::{
    Filter, FilterCategory, FilterConfiguration, FilterGroup, FilterType, HairColor,
};
pub use geometry::{bounding_rect, centroid, distance};
pub use landmarks::{
    map_point, FaceLandmarks, FaceRecord, FaceTrackingResult, LandmarkRegion, Origin, PathKind,
};
pub use mask::{
    binarize, extract_hair_mask, label_grid, soften, upscale, HairSegmentationResult,
    HAIR_CLASS_INDEX, MASK_BLUR_SIGMA,
};
pub use overlay::{render_hair_mask, render_landmarks};
pub use photo::Photo;
pub use segmentation::{
    prepare_model_input, segment_with, SegmentationModel, SegmentationWorker, WorkerConfig,
    DEFAULT_MODEL_INPUT_SIZE,
};
pub use session::{ApplyOutcome, EditSession};
pub use types::{NormalizedRect, Point, Rect, Size};
pub use warp::head_size_warp;
