//! Face parameters for the geometric filters.
//!
//! These are order-based heuristics, not a pose solve. They rely on the
//! landmark detector's ordering contract:
//!
//! - the face contour runs ear to ear, so its first and last points are the
//!   widest horizontal excursion and its middle point is the chin;
//! - the outer lip outline puts one mouth corner last and the other at
//!   index `count / 2`.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::geometry::{centroid, distance};
use crate::landmarks::{FaceRecord, FaceTrackingResult, Origin};
use crate::types::{Point, Size};

/// Lower bound for both face radii.
pub const MIN_FACE_RADIUS: f64 = 1.0;

/// Geometry of the primary face in upper-left pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceParameters {
    /// Midpoint between the two eye centroids.
    pub eye_center: Point,
    /// Horizontal face radius.
    pub radius_a: f64,
    /// Vertical face radius.
    pub radius_b: f64,
    /// Head roll in radians, within [-π/2, π/2]. Positive is clockwise on screen.
    pub angle: f64,
}

impl FaceParameters {
    /// Estimate parameters for one face. Returns `None` when the face has no landmarks.
    pub fn estimate(face: &FaceRecord, image_size: Size) -> Option<Self> {
        let landmarks = face.landmarks.as_ref()?;
        let map = |region| face.map_region(region, image_size, Origin::UpperLeft);

        let left_eye = map(&landmarks.left_eye);
        let right_eye = map(&landmarks.right_eye);
        let contour = map(&landmarks.face_contour);
        let outer_lips = map(&landmarks.outer_lips);

        let eye_center = eye_center(&left_eye, &right_eye);
        let (radius_a, radius_b) = face_radii(&contour, eye_center);

        Some(Self {
            eye_center,
            radius_a,
            radius_b,
            angle: head_angle(&outer_lips),
        })
    }

    /// Estimate parameters for the primary face of a tracking result, at the
    /// size the detector recorded.
    pub fn for_primary_face(result: &FaceTrackingResult) -> Option<Self> {
        Self::for_image(result, result.image_size)
    }

    /// Estimate parameters for the primary face, mapped onto a buffer of
    /// `image_size`. Landmarks are normalized, so this holds at any resolution.
    pub fn for_image(result: &FaceTrackingResult, image_size: Size) -> Option<Self> {
        let face = result.primary_face()?;
        Self::estimate(face, image_size)
    }
}

/// Centroid of the two eye centroids.
pub fn eye_center(left_eye: &[Point], right_eye: &[Point]) -> Point {
    centroid(&[centroid(left_eye), centroid(right_eye)])
}

/// Horizontal and vertical face radii measured from `center`.
///
/// Both are floored at [`MIN_FACE_RADIUS`]; an empty contour yields the floor.
pub fn face_radii(contour: &[Point], center: Point) -> (f64, f64) {
    let (Some(first), Some(last)) = (contour.first(), contour.last()) else {
        return (MIN_FACE_RADIUS, MIN_FACE_RADIUS);
    };

    let radius_a = distance(*first, center).max(distance(*last, center));
    let chin = contour[contour.len() / 2];
    let radius_b = distance(center, chin);

    (radius_a.max(MIN_FACE_RADIUS), radius_b.max(MIN_FACE_RADIUS))
}

/// Roll angle of the line between the mouth corners.
///
/// Needs more than two outer-lip points, otherwise returns 0.
pub fn head_angle(outer_lips: &[Point]) -> f64 {
    if outer_lips.len() <= 2 {
        return 0.0;
    }

    let left_corner = outer_lips[outer_lips.len() - 1];
    let right_corner = outer_lips[outer_lips.len() / 2];

    let dx = right_corner.x - left_corner.x;
    let dy = right_corner.y - left_corner.y;

    normalize_angle(dy.atan2(dx))
}

/// Fold any angle into [-π/2, π/2], treating a line and its reverse as the same.
///
/// Both boundaries are inclusive: π/2 stays π/2 and π folds to 0.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }

    // (-π, π]
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }

    if a > FRAC_PI_2 {
        a -= PI;
    } else if a < -FRAC_PI_2 {
        a += PI;
    }
    a
}
