//! End-to-end filter pipeline scenarios on synthesized images.

use std::sync::Arc;

use image::{GrayImage, Luma, Rgba, RgbaImage};
use ndarray::{Array, Array2, ArrayD, IxDyn};
use portrait_fx::{
    binarize, centroid, upscale, CpuBackend, DetectionData, DetectionOrchestrator, FaceLandmarkDetector,
    FaceLandmarks, FaceParameters, FaceRecord, FaceTrackingResult, FilterCategory, FilterConfiguration,
    FilterEngine, FilterType, HairSegmentationResult, ImageBackend, LandmarkRegion, NormalizedRect, Point,
    Result, SegmentationModel, SegmentationWorker, Size, WorkerConfig, HAIR_CLASS_INDEX,
    HEAD_RADIUS_A_SCALE, HEAD_RADIUS_B_SCALE,
};

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([((x * 5) % 256) as u8, ((y * 3) % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

/// One slightly tilted face in a 100x100 frame, landmarks in lower-left convention.
fn one_face() -> FaceTrackingResult {
    let landmarks = FaceLandmarks {
        left_eye: LandmarkRegion::closed(vec![
            Point::new(0.28, 0.62),
            Point::new(0.36, 0.65),
            Point::new(0.44, 0.62),
        ]),
        right_eye: LandmarkRegion::closed(vec![
            Point::new(0.56, 0.62),
            Point::new(0.64, 0.65),
            Point::new(0.72, 0.62),
        ]),
        face_contour: LandmarkRegion::open(vec![
            Point::new(0.1, 0.6),
            Point::new(0.2, 0.3),
            Point::new(0.5, 0.05),
            Point::new(0.8, 0.3),
            Point::new(0.9, 0.6),
        ]),
        outer_lips: LandmarkRegion::closed(vec![
            Point::new(0.5, 0.3),
            Point::new(0.58, 0.28),
            Point::new(0.62, 0.25),
            Point::new(0.65, 0.26),
            Point::new(0.5, 0.18),
            Point::new(0.35, 0.2),
        ]),
        ..FaceLandmarks::default()
    };
    let face = FaceRecord::new(NormalizedRect::new(0.2, 0.2, 0.6, 0.6), 0.98, Some(landmarks));
    FaceTrackingResult::new(vec![face], Size::new(100.0, 100.0))
}

fn hair_mask(width: u32, height: u32, value: u8) -> DetectionData {
    let mask = GrayImage::from_pixel(width, height, Luma([value]));
    DetectionData::HairSegmentation(Arc::new(HairSegmentationResult::new(mask.clone(), mask)))
}

fn hue_degrees(p: &Rgba<u8>) -> f32 {
    let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0.0 {
        return 0.0;
    }
    let h = if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

fn mean_hue(image: &RgbaImage, mask: &GrayImage) -> f32 {
    let hues: Vec<f32> = image
        .pixels()
        .zip(mask.pixels())
        .filter(|(_, m)| m[0] > 0)
        .map(|(p, _)| hue_degrees(p))
        .collect();
    hues.iter().sum::<f32>() / hues.len() as f32
}

#[test]
fn head_size_changes_only_the_warp_region() {
    let engine = FilterEngine::cpu().unwrap();
    let image = gradient(100, 100);
    let faces = one_face();
    let params = FaceParameters::for_image(&faces, Size::from_dimensions(image.dimensions())).unwrap();
    assert!(params.angle.abs() > 1e-3, "fixture should be tilted");

    let config = FilterConfiguration::new(FilterType::HeadSize, 0.5);
    let data = DetectionData::FaceLandmarks(Arc::new(faces));
    let out = engine.apply_filter(&image, &config, Some(&data)).unwrap();

    let radius_a = params.radius_a * HEAD_RADIUS_A_SCALE;
    let radius_b = params.radius_b * HEAD_RADIUS_B_SCALE;
    let (sin, cos) = params.angle.sin_cos();
    let ellipse_distance = |x: u32, y: u32| {
        let dx = x as f64 - params.eye_center.x;
        let dy = y as f64 - params.eye_center.y;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        (u / radius_a).powi(2) + (v / radius_b).powi(2)
    };

    let mut changed = 0;
    for (x, y, p) in out.enumerate_pixels() {
        if p != image.get_pixel(x, y) {
            let r2 = ellipse_distance(x, y);
            assert!(r2 < 1.0 + 1e-9, "({x}, {y}) changed outside the ellipse, r² = {r2:.3}");
            changed += 1;
        }
    }
    assert!(changed > 0);
}

#[test]
fn head_size_without_faces_is_identity() {
    let engine = FilterEngine::cpu().unwrap();
    let image = gradient(80, 60);
    let data = DetectionData::FaceLandmarks(Arc::new(FaceTrackingResult::new(Vec::new(), Size::new(80.0, 60.0))));

    let config = FilterConfiguration::new(FilterType::HeadSize, 0.7);
    assert_eq!(engine.apply_filter(&image, &config, Some(&data)).unwrap(), image);
}

#[test]
fn hair_filters_with_empty_mask_are_identity() {
    let engine = FilterEngine::cpu().unwrap();
    let image = gradient(48, 32);
    let data = hair_mask(48, 32, 0);

    for filter in FilterCategory::Hair.filter_types() {
        for intensity in [-1.0, 0.35, 1.0] {
            let out = engine
                .apply_filter(&image, &FilterConfiguration::new(filter, intensity), Some(&data))
                .unwrap();
            assert_eq!(out, image, "{filter} at {intensity}");
        }
    }
}

#[test]
fn blonde_and_black_shift_hue_differently() {
    let engine = FilterEngine::cpu().unwrap();
    let image = RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]));
    let data = hair_mask(32, 32, 255);
    let mask = GrayImage::from_pixel(32, 32, Luma([255]));

    let blonde = engine
        .apply_filter(&image, &FilterConfiguration::new(FilterType::HairColorBlonde, 1.0), Some(&data))
        .unwrap();
    let black = engine
        .apply_filter(&image, &FilterConfiguration::new(FilterType::HairColorBlack, 1.0), Some(&data))
        .unwrap();

    let blonde_hue = mean_hue(&blonde, &mask);
    let black_hue = mean_hue(&black, &mask);
    assert!((blonde_hue - black_hue).abs() > 20.0, "blonde {blonde_hue} black {black_hue}");
    assert_ne!(blonde, black);
}

#[test]
fn blend_endpoints_select_one_input() {
    let backend = CpuBackend::new();
    let adjusted = gradient(20, 10);
    let original = RgbaImage::from_pixel(20, 10, Rgba([7, 8, 9, 255]));

    let clear = GrayImage::from_pixel(20, 10, Luma([0]));
    assert_eq!(backend.blend_with_mask(&adjusted, &original, &clear).unwrap(), original);

    let opaque = GrayImage::from_pixel(20, 10, Luma([255]));
    assert_eq!(backend.blend_with_mask(&adjusted, &original, &opaque).unwrap(), adjusted);
}

#[test]
fn full_and_empty_label_grids_give_solid_masks() {
    let all_hair = Array2::from_elem((16, 16), HAIR_CLASS_INDEX);
    let mask = upscale(&binarize(all_hair.view(), HAIR_CLASS_INDEX).unwrap(), 90, 70);
    assert_eq!(mask.dimensions(), (90, 70));
    assert!(mask.pixels().all(|p| p[0] == 255));

    let no_hair = Array2::from_elem((16, 16), 3);
    let mask = upscale(&binarize(no_hair.view(), HAIR_CLASS_INDEX).unwrap(), 90, 70);
    assert!(mask.pixels().all(|p| p[0] == 0));
}

#[test]
fn centroid_ignores_point_order() {
    let points: Vec<Point> = (0..25)
        .map(|i| Point::new((i * 37 % 11) as f64 * 0.7, (i * 13 % 7) as f64 - 2.5))
        .collect();
    let reversed: Vec<Point> = points.iter().rev().copied().collect();

    let a = centroid(&points);
    let b = centroid(&reversed);
    assert!((a.x - b.x).abs() < 1e-9);
    assert!((a.y - b.y).abs() < 1e-9);
}

/// Replays a fixed face detection.
struct FixedFaces(FaceTrackingResult);

impl FaceLandmarkDetector for FixedFaces {
    async fn detect_faces(&self, _image: Arc<RgbaImage>) -> Result<FaceTrackingResult> {
        Ok(self.0.clone())
    }
}

/// Labels the top third of the frame as hair.
struct TopThirdHair;

impl SegmentationModel for TopThirdHair {
    fn input_size(&self) -> (u32, u32) {
        (30, 30)
    }

    fn predict(&mut self, input: &image::RgbImage) -> Result<ArrayD<i32>> {
        let (w, h) = input.dimensions();
        let mut labels = Array::from_elem(IxDyn(&[1, 1, h as usize, w as usize]), 0);
        for y in 0..(h as usize / 3) {
            for x in 0..w as usize {
                labels[[0, 0, y, x]] = HAIR_CLASS_INDEX;
            }
        }
        Ok(labels)
    }
}

#[tokio::test]
async fn detect_then_filter_end_to_end() {
    let image = Arc::new(gradient(100, 100));
    let worker = SegmentationWorker::spawn(TopThirdHair, WorkerConfig::new().thread_name("test-seg")).unwrap();
    let orchestrator = DetectionOrchestrator::new(FixedFaces(one_face()), worker);
    let engine = FilterEngine::cpu().unwrap();

    let configs = [
        FilterConfiguration::new(FilterType::HeadSize, 0.4),
        FilterConfiguration::new(FilterType::Coolness, 0.8),
    ];
    let data = orchestrator.detect_for(image.clone(), &configs).await.unwrap().unwrap();
    assert_eq!(data.categories(), vec![FilterCategory::Sizes, FilterCategory::Hair]);

    let hair = data.hair_segmentation_result().unwrap();
    assert_eq!(hair.hair_mask.dimensions(), (100, 100));

    let cooled = engine.apply_filter(&image, &configs[1], Some(&data)).unwrap();
    // Far below the hair band nothing changes.
    assert_eq!(cooled.get_pixel(50, 95), image.get_pixel(50, 95));
    // Inside the band, blue goes up.
    assert!(cooled.get_pixel(50, 5)[2] > image.get_pixel(50, 5)[2]);

    let both = engine.apply_filters(&image, &configs, Some(&data)).unwrap();
    assert_ne!(both, *image);
}
