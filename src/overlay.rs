//! Debug overlays for detection results.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::landmarks::{FaceTrackingResult, LandmarkRegion, Origin};
use crate::mask::{upscale, HairSegmentationResult};
use crate::types::{Point, Size};

pub const BOUNDING_BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const CONTOUR_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const EYEBROW_COLOR: Rgba<u8> = Rgba([255, 165, 0, 255]);
pub const EYE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const OUTER_LIPS_COLOR: Rgba<u8> = Rgba([128, 0, 128, 255]);
pub const INNER_LIPS_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Hair overlay tint and its opacity where the mask is fully set.
pub const HAIR_OVERLAY_COLOR: [u8; 3] = [0, 255, 255];
pub const HAIR_OVERLAY_OPACITY: f32 = 0.6;

/// Colors for `FaceLandmarks::outline_regions`, in order.
const REGION_COLORS: [Rgba<u8>; 7] = [
    CONTOUR_COLOR,
    EYEBROW_COLOR,
    EYEBROW_COLOR,
    EYE_COLOR,
    EYE_COLOR,
    OUTER_LIPS_COLOR,
    INNER_LIPS_COLOR,
];

const POINT_RADIUS: i32 = 2;

/// Draw bounding boxes and landmark outlines for every detected face.
pub fn render_landmarks(image: &RgbaImage, faces: &FaceTrackingResult) -> RgbaImage {
    let mut canvas = image.clone();
    let size = Size::from_dimensions(image.dimensions());

    for face in &faces.faces {
        let bbox = face.bounding_box.to_image_rect(size, Origin::UpperLeft);
        if bbox.width >= 1.0 && bbox.height >= 1.0 {
            let rect = Rect::at(bbox.x.round() as i32, bbox.y.round() as i32)
                .of_size(bbox.width.round() as u32, bbox.height.round() as u32);
            draw_hollow_rect_mut(&mut canvas, rect, BOUNDING_BOX_COLOR);
        }

        let Some(landmarks) = &face.landmarks else {
            continue;
        };

        for (region, color) in landmarks.outline_regions().into_iter().zip(REGION_COLORS) {
            let points = face.map_region(region, size, Origin::UpperLeft);
            draw_region(&mut canvas, region, &points, color);
        }
    }
    canvas
}

fn draw_region(canvas: &mut RgbaImage, region: &LandmarkRegion, points: &[Point], color: Rgba<u8>) {
    let as_f32 = |p: &Point| (p.x as f32, p.y as f32);

    for pair in points.windows(2) {
        draw_line_segment_mut(canvas, as_f32(&pair[0]), as_f32(&pair[1]), color);
    }
    if region.is_closed() && points.len() > 2 {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            draw_line_segment_mut(canvas, as_f32(last), as_f32(first), color);
        }
    }
    for p in points {
        draw_filled_circle_mut(canvas, (p.x.round() as i32, p.y.round() as i32), POINT_RADIUS, color);
    }
}

/// Tint the hard-edged hair mask over the image.
pub fn render_hair_mask(image: &RgbaImage, hair: &HairSegmentationResult) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mask = upscale(&hair.original_hair_mask, width, height);

    let mut canvas = image.clone();
    for (p, m) in canvas.pixels_mut().zip(mask.pixels()) {
        let alpha = HAIR_OVERLAY_OPACITY * m[0] as f32 / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        for c in 0..3 {
            let blended = p[c] as f32 * (1.0 - alpha) + HAIR_OVERLAY_COLOR[c] as f32 * alpha;
            p[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    canvas
}
