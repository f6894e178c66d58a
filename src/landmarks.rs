//! Face detection data and the landmark coordinate mapper.
//!
//! Detectors report a face bounding box normalized to the full image and
//! landmark points normalized to that bounding box, both with a lower-left
//! origin. Everything downstream (parameter estimation, warping, overlays)
//! works in upper-left pixel space, the layout of an [`image::RgbaImage`].
//! [`map_point`] is the only place the vertical flip happens.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{NormalizedRect, Point, Rect, Size};

/// Origin of a pixel coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// y grows upwards from the bottom edge (detector convention).
    LowerLeft,
    /// y grows downwards from the top edge (image buffer convention).
    UpperLeft,
}

/// Map a face-relative normalized landmark point to absolute pixel coordinates.
pub fn map_point(p: Point, bbox: &NormalizedRect, image_size: Size, origin: Origin) -> Point {
    let normalized = bbox.denormalize_point(p);
    let x = normalized.x * image_size.width;
    let y = normalized.y * image_size.height;

    match origin {
        Origin::LowerLeft => Point::new(x, y),
        Origin::UpperLeft => Point::new(x, image_size.height - y),
    }
}

impl NormalizedRect {
    /// Convert this image-normalized rect to pixel space.
    pub fn to_image_rect(&self, image_size: Size, origin: Origin) -> Rect {
        let x = self.x * image_size.width;
        let width = self.width * image_size.width;
        let height = self.height * image_size.height;
        let y = match origin {
            Origin::LowerLeft => self.y * image_size.height,
            Origin::UpperLeft => image_size.height - (self.y + self.height) * image_size.height,
        };
        Rect::new(x, y, width, height)
    }
}

/// Whether a region outlines a closed contour (eyes, lips) or an open path
/// (face contour, eyebrows, nose). Only affects rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    #[default]
    Open,
    Closed,
}

/// An ordered list of landmark points outlining one anatomical feature.
///
/// Point order is the detector's anatomical order and is relied upon by the
/// estimators (see [`crate::estimator`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRegion {
    pub points: Vec<Point>,
    #[serde(default)]
    pub path: PathKind,
}

impl LandmarkRegion {
    pub fn new(points: Vec<Point>, path: PathKind) -> Self {
        Self { points, path }
    }

    pub fn open(points: Vec<Point>) -> Self {
        Self::new(points, PathKind::Open)
    }

    pub fn closed(points: Vec<Point>) -> Self {
        Self::new(points, PathKind::Closed)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.path == PathKind::Closed
    }

    /// Map every point of the region into pixel space.
    pub fn to_image_points(
        &self,
        bbox: &NormalizedRect,
        image_size: Size,
        origin: Origin,
    ) -> Vec<Point> {
        self.points
            .iter()
            .map(|p| map_point(*p, bbox, image_size, origin))
            .collect()
    }
}

/// Named landmark regions of one detected face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLandmarks {
    pub all_points: LandmarkRegion,
    pub face_contour: LandmarkRegion,
    pub left_eyebrow: LandmarkRegion,
    pub right_eyebrow: LandmarkRegion,
    pub left_eye: LandmarkRegion,
    pub right_eye: LandmarkRegion,
    pub outer_lips: LandmarkRegion,
    pub inner_lips: LandmarkRegion,
    pub nose: LandmarkRegion,
}

impl FaceLandmarks {
    /// Regions drawn by the overlay, in drawing order.
    pub fn outline_regions(&self) -> [&LandmarkRegion; 7] {
        [
            &self.face_contour,
            &self.left_eyebrow,
            &self.right_eyebrow,
            &self.left_eye,
            &self.right_eye,
            &self.outer_lips,
            &self.inner_lips,
        ]
    }
}

/// One detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub bounding_box: NormalizedRect,
    #[serde(default)]
    pub confidence: f32,
    /// Detectors may report geometry without fine landmarks.
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
    #[serde(skip, default = "SystemTime::now")]
    pub detected_at: SystemTime,
}

impl FaceRecord {
    pub fn new(bounding_box: NormalizedRect, confidence: f32, landmarks: Option<FaceLandmarks>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bounding_box,
            confidence,
            landmarks,
            detected_at: SystemTime::now(),
        }
    }

    /// Map one of this face's regions into pixel space.
    pub fn map_region(&self, region: &LandmarkRegion, image_size: Size, origin: Origin) -> Vec<Point> {
        region.to_image_points(&self.bounding_box, image_size, origin)
    }
}

/// Output of one face-landmark detection run.
///
/// Faces keep the detector's emission order; the first one is the primary face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceTrackingResult {
    pub faces: Vec<FaceRecord>,
    #[serde(default)]
    pub image_size: Size,
    #[serde(skip, default = "SystemTime::now")]
    pub processed_at: SystemTime,
}

impl FaceTrackingResult {
    pub fn new(faces: Vec<FaceRecord>, image_size: Size) -> Self {
        Self {
            faces,
            image_size,
            processed_at: SystemTime::now(),
        }
    }

    pub fn has_faces(&self) -> bool {
        !self.faces.is_empty()
    }

    pub fn primary_face(&self) -> Option<&FaceRecord> {
        self.faces.first()
    }
}
