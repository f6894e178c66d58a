//! Point-set helpers shared by the landmark estimators and the overlay.

use crate::types::{Point, Rect};

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(&b)
}

/// Arithmetic mean of a point set. Returns the origin for an empty set.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::zero();
    }

    let mut sum = Point::zero();
    for p in points {
        sum += *p;
    }

    sum * (1.0 / points.len() as f64)
}

/// Smallest axis-aligned rectangle containing every point.
/// Returns a zero rect for an empty set.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::zero();
    };

    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x, first.y);

    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_empty_set_is_origin() {
        assert_eq!(centroid(&[]), Point::zero());
    }

    #[test]
    fn centroid_is_order_independent() {
        let points = vec![
            Point::new(0.1, 7.3),
            Point::new(-4.0, 2.5),
            Point::new(12.75, -3.0),
            Point::new(5.5, 5.5),
            Point::new(1e-3, 100.0),
        ];
        let mut reversed = points.clone();
        reversed.reverse();

        let a = centroid(&points);
        let b = centroid(&reversed);
        assert!((a.x - b.x).abs() < 1e-9);
        assert!((a.y - b.y).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_square() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let c = centroid(&square);
        assert!((c.x - 5.0).abs() < 1e-12);
        assert!((c.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn bounding_rect_of_points() {
        let points = [
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(1.0, 1.0),
        ];
        let rect = bounding_rect(&points);
        assert_eq!(rect, Rect::new(-2.0, -1.0, 5.0, 5.0));
    }

    #[test]
    fn bounding_rect_of_empty_set_is_zero() {
        assert_eq!(bounding_rect(&[]), Rect::zero());
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(4.0, 5.0);
        assert!((distance(a, b) - 5.0).abs() < 1e-12);
        assert_eq!(distance(a, b), distance(b, a));
    }
}
