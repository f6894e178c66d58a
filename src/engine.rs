//! Filter dispatch and composition.
//!
//! [`FilterEngine::apply_filter`] routes a [`FilterConfiguration`] by category:
//! Sizes filters warp the full image around the primary face, Hair filters
//! produce an adjusted full image that is blended over the original through
//! the feathered hair mask. A missing face or mask makes the filter a no-op.

use std::sync::Arc;

use image::RgbaImage;

use crate::backend::{CpuBackend, ImageBackend};
use crate::color::{Adjustment, Rgb, NEUTRAL_TEMPERATURE};
use crate::detection::DetectionData;
use crate::error::Result;
use crate::estimator::FaceParameters;
use crate::filter::{FilterCategory, FilterConfiguration, FilterType, HairColor};
use crate::landmarks::FaceTrackingResult;
use crate::mask::HairSegmentationResult;
use crate::types::Size;

// Calibration. These set the feel of each effect and are not configurable.

/// Horizontal warp radius relative to the contour-based face radius.
pub const HEAD_RADIUS_A_SCALE: f64 = 1.36;
/// Vertical warp radius relative to the contour-based face radius.
pub const HEAD_RADIUS_B_SCALE: f64 = 1.37;
/// Warp strength per unit of intensity.
pub const HEAD_SIZE_STRENGTH: f64 = 0.11;

pub const HAIR_COLOR_STRENGTH: f32 = 0.3;
pub const BLONDE_COLOR_STRENGTH: f32 = 0.25;

pub const COLOR_TONE_TEMPERATURE_SHIFT: f32 = 2000.0;
pub const COLOR_TONE_TINT_SHIFT: f32 = 150.0;
pub const WARMTH_TEMPERATURE_SHIFT: f32 = 1500.0;
pub const MAGENTA_GREEN_TINT_SHIFT: f32 = 150.0;

pub const BALANCE_WHITE_POINT_SHIFT: f32 = 0.1;
pub const TINT_BALANCE_CHANNEL_SHIFT: f32 = 0.1;

pub const COLOR_CAST_SATURATION: f32 = 0.2;
pub const INTENSITY_SATURATION: f32 = 0.5;
pub const RICHNESS_SATURATION: f32 = 0.3;
pub const RICHNESS_CONTRAST: f32 = 0.1;

pub const HIGHLIGHT_AMOUNT: f32 = 0.5;
pub const HIGHLIGHT_RADIUS_SCALE: f32 = 5.0;
pub const HIGHLIGHT_RADIUS_BASE: f32 = 1.0;

/// Transform a hair filter produces before masking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HairTransform {
    Adjust(Adjustment),
    Grade { target: Rgb, strength: f32 },
}

/// Strength of a hair color grade for `intensity`.
pub fn hair_color_strength(color: HairColor, intensity: f32) -> f32 {
    let sensitivity = match color {
        HairColor::Blonde => BLONDE_COLOR_STRENGTH,
        _ => HAIR_COLOR_STRENGTH,
    };
    intensity.abs() * sensitivity
}

/// Map a hair-category filter and its intensity to the transform it runs.
///
/// Returns `None` for filters outside the Hair category.
pub fn hair_transform(filter: FilterType, intensity: f32) -> Option<HairTransform> {
    use FilterType::*;

    let neutral = (NEUTRAL_TEMPERATURE, 0.0);
    let transform = match filter {
        HeadSize => return None,

        HairColorBlack | HairColorDarkBrown | HairColorBrown | HairColorLightBrown
        | HairColorBlonde | HairColorPlatinumBlonde | HairColorRed | HairColorAuburn
        | HairColorCopper | HairColorBurgundy => {
            let color = filter.hair_color()?;
            HairTransform::Grade {
                target: color.rgb(),
                strength: hair_color_strength(color, intensity),
            }
        }

        Hue => HairTransform::Adjust(Adjustment::HueRotation {
            angle: intensity * std::f32::consts::PI,
        }),
        ColorTone => HairTransform::Adjust(Adjustment::TemperatureTint {
            neutral,
            target: (
                NEUTRAL_TEMPERATURE + COLOR_TONE_TEMPERATURE_SHIFT * intensity,
                COLOR_TONE_TINT_SHIFT * intensity,
            ),
        }),
        Highlights => HairTransform::Adjust(Adjustment::HighlightShadow {
            highlight: 1.0 + HIGHLIGHT_AMOUNT * intensity,
            shadow: 0.0,
            radius: intensity.abs() * HIGHLIGHT_RADIUS_SCALE + HIGHLIGHT_RADIUS_BASE,
        }),

        Warmth => HairTransform::Adjust(Adjustment::TemperatureTint {
            neutral,
            target: (NEUTRAL_TEMPERATURE - WARMTH_TEMPERATURE_SHIFT * intensity, 0.0),
        }),
        Coolness => HairTransform::Adjust(Adjustment::TemperatureTint {
            neutral,
            target: (NEUTRAL_TEMPERATURE + WARMTH_TEMPERATURE_SHIFT * intensity, 0.0),
        }),
        Balance => HairTransform::Adjust(Adjustment::WhitePoint {
            color: [
                1.0 + BALANCE_WHITE_POINT_SHIFT * intensity,
                1.0,
                1.0 - BALANCE_WHITE_POINT_SHIFT * intensity,
            ],
        }),

        MagentaGreen => HairTransform::Adjust(Adjustment::TemperatureTint {
            neutral,
            target: (NEUTRAL_TEMPERATURE, MAGENTA_GREEN_TINT_SHIFT * intensity),
        }),
        TintBalance => HairTransform::Adjust(Adjustment::ChannelScale {
            scale: [
                1.0 + TINT_BALANCE_CHANNEL_SHIFT * intensity,
                1.0,
                1.0 - TINT_BALANCE_CHANNEL_SHIFT * intensity,
            ],
        }),
        ColorCast => HairTransform::Adjust(Adjustment::ColorControls {
            saturation: 1.0 + COLOR_CAST_SATURATION * intensity,
            contrast: 1.0,
        }),

        Vibrance => HairTransform::Adjust(Adjustment::Vibrance { amount: intensity }),
        Intensity => HairTransform::Adjust(Adjustment::ColorControls {
            saturation: 1.0 + INTENSITY_SATURATION * intensity,
            contrast: 1.0,
        }),
        Richness => HairTransform::Adjust(Adjustment::ColorControls {
            saturation: 1.0 + RICHNESS_SATURATION * intensity,
            contrast: 1.0 + RICHNESS_CONTRAST * intensity,
        }),
    };
    Some(transform)
}

/// Applies filter configurations to images. Cheap to clone and safe to share.
#[derive(Clone)]
pub struct FilterEngine {
    backend: Arc<dyn ImageBackend>,
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl FilterEngine {
    /// Build an engine on `backend`, failing if the backend does not work.
    pub fn new(backend: Arc<dyn ImageBackend>) -> Result<Self> {
        backend.probe()?;
        log::debug!("[engine] using {} backend", backend.name());
        Ok(Self { backend })
    }

    pub fn cpu() -> Result<Self> {
        Self::new(Arc::new(CpuBackend::new()))
    }

    pub fn backend(&self) -> &dyn ImageBackend {
        self.backend.as_ref()
    }

    /// Shared handle to the backend, for a [`crate::SegmentationWorker`] to
    /// run its mask pipeline on.
    pub fn shared_backend(&self) -> Arc<dyn ImageBackend> {
        self.backend.clone()
    }

    /// Apply one filter. The input is never modified; a new buffer is returned.
    pub fn apply_filter(
        &self,
        image: &RgbaImage,
        configuration: &FilterConfiguration,
        detection: Option<&DetectionData>,
    ) -> Result<RgbaImage> {
        match configuration.category() {
            FilterCategory::Sizes => Ok(self.apply_size_filter(
                image,
                configuration,
                detection.and_then(|d| d.face_tracking_result()),
            )),
            FilterCategory::Hair => self.apply_hair_filter(
                image,
                configuration,
                detection.and_then(|d| d.hair_segmentation_result()),
            ),
        }
    }

    /// Apply several filters in order, each on the previous output.
    pub fn apply_filters(
        &self,
        image: &RgbaImage,
        configurations: &[FilterConfiguration],
        detection: Option<&DetectionData>,
    ) -> Result<RgbaImage> {
        let mut current = image.clone();
        for configuration in configurations {
            current = self.apply_filter(&current, configuration, detection)?;
        }
        Ok(current)
    }

    fn apply_size_filter(
        &self,
        image: &RgbaImage,
        configuration: &FilterConfiguration,
        faces: Option<&FaceTrackingResult>,
    ) -> RgbaImage {
        let size = Size::from_dimensions(image.dimensions());
        let Some(params) = faces.and_then(|faces| FaceParameters::for_image(faces, size)) else {
            log::debug!("[engine] {} skipped: no face landmarks", configuration.filter);
            return image.clone();
        };

        match configuration.filter {
            FilterType::HeadSize => {
                let strength = HEAD_SIZE_STRENGTH * configuration.intensity as f64;
                log::trace!(
                    "[engine] head warp at ({:.1}, {:.1}) radii {:.1}x{:.1} angle {:.3} strength {:.3}",
                    params.eye_center.x,
                    params.eye_center.y,
                    params.radius_a,
                    params.radius_b,
                    params.angle,
                    strength
                );
                self.backend.head_size_warp(
                    image,
                    params.eye_center,
                    params.radius_a * HEAD_RADIUS_A_SCALE,
                    params.radius_b * HEAD_RADIUS_B_SCALE,
                    strength,
                    params.angle,
                )
            }
            _ => image.clone(),
        }
    }

    fn apply_hair_filter(
        &self,
        image: &RgbaImage,
        configuration: &FilterConfiguration,
        hair: Option<&HairSegmentationResult>,
    ) -> Result<RgbaImage> {
        let Some(hair) = hair else {
            log::debug!("[engine] {} skipped: no hair mask", configuration.filter);
            return Ok(image.clone());
        };
        let Some(transform) = hair_transform(configuration.filter, configuration.intensity) else {
            return Ok(image.clone());
        };

        let adjusted = match transform {
            HairTransform::Adjust(adjustment) => self.backend.adjust(image, &adjustment),
            HairTransform::Grade { target, strength } => {
                self.backend.hair_color_grade(image, target, strength)
            }
        };

        self.backend.blend_with_mask(&adjusted, image, &hair.hair_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{NormalizedRect, Point};
    use crate::landmarks::{FaceLandmarks, FaceRecord, LandmarkRegion};
    use image::{GrayImage, Luma, Rgba};

    fn portrait() -> RgbaImage {
        RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 3) as u8, (y * 3) as u8, 120, 255]))
    }

    fn hair(mask_value: u8) -> DetectionData {
        DetectionData::HairSegmentation(Arc::new(HairSegmentationResult::new(
            GrayImage::from_pixel(64, 64, Luma([mask_value])),
            GrayImage::from_pixel(64, 64, Luma([mask_value])),
        )))
    }

    fn face() -> DetectionData {
        let landmarks = FaceLandmarks {
            left_eye: LandmarkRegion::closed(vec![Point::new(0.3, 0.6)]),
            right_eye: LandmarkRegion::closed(vec![Point::new(0.7, 0.6)]),
            face_contour: LandmarkRegion::open(vec![
                Point::new(0.1, 0.6),
                Point::new(0.5, 0.1),
                Point::new(0.9, 0.6),
            ]),
            outer_lips: LandmarkRegion::closed(vec![
                Point::new(0.5, 0.3),
                Point::new(0.6, 0.3),
                Point::new(0.4, 0.3),
            ]),
            ..FaceLandmarks::default()
        };
        let record = FaceRecord::new(NormalizedRect::new(0.25, 0.25, 0.5, 0.5), 1.0, Some(landmarks));
        DetectionData::FaceLandmarks(Arc::new(FaceTrackingResult::new(vec![record], Size::new(64.0, 64.0))))
    }

    #[test]
    fn every_hair_filter_has_a_transform() {
        for t in FilterType::ALL {
            assert_eq!(
                hair_transform(t, 0.5).is_some(),
                t.category() == FilterCategory::Hair,
                "{t}"
            );
        }
    }

    #[test]
    fn zero_intensity_hair_filters_are_identity() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let data = hair(255);

        for t in FilterCategory::Hair.filter_types() {
            let out = engine
                .apply_filter(&image, &FilterConfiguration::new(t, 0.0), Some(&data))
                .unwrap();
            assert_eq!(out, image, "{t}");
        }
    }

    #[test]
    fn calibration_constants() {
        match hair_transform(FilterType::Warmth, 1.0) {
            Some(HairTransform::Adjust(Adjustment::TemperatureTint { target, .. })) => {
                assert_eq!(target, (5000.0, 0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        match hair_transform(FilterType::ColorTone, -0.5) {
            Some(HairTransform::Adjust(Adjustment::TemperatureTint { target, .. })) => {
                assert_eq!(target, (5500.0, -75.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        match hair_transform(FilterType::Highlights, -1.0) {
            Some(HairTransform::Adjust(Adjustment::HighlightShadow { highlight, shadow, radius })) => {
                assert_eq!((highlight, shadow, radius), (0.5, 0.0, 6.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(hair_color_strength(HairColor::Blonde, -1.0), 0.25);
        assert_eq!(hair_color_strength(HairColor::Red, 0.5), 0.15);
    }

    #[test]
    fn missing_detection_is_a_no_op() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();

        let head = FilterConfiguration::new(FilterType::HeadSize, 1.0);
        assert_eq!(engine.apply_filter(&image, &head, None).unwrap(), image);
        assert_eq!(engine.apply_filter(&image, &head, Some(&hair(255))).unwrap(), image);

        let hue = FilterConfiguration::new(FilterType::Hue, 0.5);
        assert_eq!(engine.apply_filter(&image, &hue, None).unwrap(), image);
        assert_eq!(engine.apply_filter(&image, &hue, Some(&face())).unwrap(), image);
    }

    #[test]
    fn clear_mask_keeps_original() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let config = FilterConfiguration::new(FilterType::Intensity, 1.0);
        assert_eq!(engine.apply_filter(&image, &config, Some(&hair(0))).unwrap(), image);
    }

    #[test]
    fn opaque_mask_shows_adjusted_image() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let config = FilterConfiguration::new(FilterType::Hue, 0.5);

        let expected = Adjustment::HueRotation {
            angle: 0.5 * std::f32::consts::PI,
        }
        .apply(&image);
        assert_eq!(engine.apply_filter(&image, &config, Some(&hair(255))).unwrap(), expected);
    }

    #[test]
    fn head_size_changes_pixels_near_face() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let config = FilterConfiguration::new(FilterType::HeadSize, 1.0);
        let out = engine.apply_filter(&image, &config, Some(&face())).unwrap();
        assert_ne!(out, image);
        assert_eq!(out.dimensions(), image.dimensions());
    }

    #[test]
    fn head_size_uses_buffer_size_not_recorded_size() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let config = FilterConfiguration::new(FilterType::HeadSize, 1.0);

        // Faces loaded without a recorded size still warp.
        let json = r#"{"faces": [{
            "bounding_box": {"x": 0.25, "y": 0.25, "width": 0.5, "height": 0.5},
            "landmarks": {
                "left_eye": {"points": [{"x": 0.3, "y": 0.6}]},
                "right_eye": {"points": [{"x": 0.7, "y": 0.6}]},
                "face_contour": {"points": [{"x": 0.1, "y": 0.6}, {"x": 0.5, "y": 0.1}, {"x": 0.9, "y": 0.6}]},
                "outer_lips": {"points": [{"x": 0.5, "y": 0.3}, {"x": 0.6, "y": 0.3}, {"x": 0.4, "y": 0.3}]}
            }
        }]}"#;
        let unsized_faces: FaceTrackingResult = serde_json::from_str(json).unwrap();
        assert!(unsized_faces.image_size.is_empty());
        let data = DetectionData::FaceLandmarks(Arc::new(unsized_faces.clone()));
        let unsized_out = engine.apply_filter(&image, &config, Some(&data)).unwrap();
        assert_ne!(unsized_out, image);

        // Detection at another resolution lands in the same place.
        let mut large = unsized_faces;
        large.image_size = Size::new(640.0, 640.0);
        let data = DetectionData::FaceLandmarks(Arc::new(large));
        assert_eq!(engine.apply_filter(&image, &config, Some(&data)).unwrap(), unsized_out);

        assert_eq!(engine.apply_filter(&image, &config, Some(&face())).unwrap(), unsized_out);
    }

    #[test]
    fn apply_filters_chains_in_order() {
        let engine = FilterEngine::cpu().unwrap();
        let image = portrait();
        let data = hair(255);
        let configs = [
            FilterConfiguration::new(FilterType::Warmth, 0.5),
            FilterConfiguration::new(FilterType::Intensity, 0.5),
        ];

        let step = engine.apply_filter(&image, &configs[0], Some(&data)).unwrap();
        let step = engine.apply_filter(&step, &configs[1], Some(&data)).unwrap();
        assert_eq!(engine.apply_filters(&image, &configs, Some(&data)).unwrap(), step);
    }

    struct DeadBackend;

    impl ImageBackend for DeadBackend {
        fn name(&self) -> &str {
            "dead"
        }
        fn probe(&self) -> Result<()> {
            Err(Error::BackendUnavailable("no device".to_string()))
        }
        fn scale(&self, image: &RgbaImage, _: u32, _: u32) -> RgbaImage {
            image.clone()
        }
        fn scale_mask(&self, mask: &GrayImage, _: u32, _: u32) -> GrayImage {
            mask.clone()
        }
        fn gaussian_blur(&self, mask: &GrayImage, _: f32) -> GrayImage {
            mask.clone()
        }
        fn adjust(&self, image: &RgbaImage, _: &Adjustment) -> RgbaImage {
            image.clone()
        }
        fn blend_with_mask(&self, _: &RgbaImage, b: &RgbaImage, _: &GrayImage) -> Result<RgbaImage> {
            Ok(b.clone())
        }
        fn head_size_warp(&self, image: &RgbaImage, _: Point, _: f64, _: f64, _: f64, _: f64) -> RgbaImage {
            image.clone()
        }
        fn hair_color_grade(&self, image: &RgbaImage, _: Rgb, _: f32) -> RgbaImage {
            image.clone()
        }
    }

    #[test]
    fn unavailable_backend_fails_construction() {
        let err = FilterEngine::new(Arc::new(DeadBackend)).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }
}
