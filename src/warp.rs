//! Localized elliptical magnify/shrink warp used by the head size filter.

use image::{Rgba, RgbaImage};

use crate::types::Point;

/// Warp the region inside a rotated ellipse around `center`.
///
/// Coordinates are upper-left pixel space. For an output pixel at offset `d`
/// from the center, with ellipse distance `r` measured after rotating `d` by
/// `-angle`, the source is sampled at `center + d * (1 - strength * (1 - r²)²)`.
/// Positive strength magnifies, negative shrinks. Pixels with `r >= 1` are
/// copied unchanged, so the output differs from the input only inside the
/// ellipse.
pub fn head_size_warp(
    image: &RgbaImage,
    center: Point,
    radius_a: f64,
    radius_b: f64,
    strength: f64,
    angle: f64,
) -> RgbaImage {
    let mut out = image.clone();
    if strength == 0.0 || !strength.is_finite() || radius_a <= 0.0 || radius_b <= 0.0 {
        return out;
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return out;
    }

    let angle = if angle.is_finite() { angle } else { 0.0 };
    let (sin, cos) = angle.sin_cos();

    // Axis-aligned extent of the rotated ellipse.
    let extent_x = ((radius_a * cos).powi(2) + (radius_b * sin).powi(2)).sqrt();
    let extent_y = ((radius_a * sin).powi(2) + (radius_b * cos).powi(2)).sqrt();

    let x_start = (center.x - extent_x).floor().max(0.0) as u32;
    let y_start = (center.y - extent_y).floor().max(0.0) as u32;
    let x_end = (center.x + extent_x).ceil().min((width - 1) as f64);
    let y_end = (center.y + extent_y).ceil().min((height - 1) as f64);
    if x_end < 0.0 || y_end < 0.0 {
        return out;
    }
    let (x_end, y_end) = (x_end as u32, y_end as u32);

    for y in y_start..=y_end {
        for x in x_start..=x_end {
            let dx = x as f64 - center.x;
            let dy = y as f64 - center.y;

            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            let r2 = (u / radius_a).powi(2) + (v / radius_b).powi(2);
            if r2 >= 1.0 {
                continue;
            }

            let falloff = (1.0 - r2) * (1.0 - r2);
            let scale = (1.0 - strength * falloff).max(0.0);
            let sx = center.x + dx * scale;
            let sy = center.y + dy * scale;

            out.put_pixel(x, y, sample_bilinear(image, sx, sy));
        }
    }
    out
}

/// Bilinear RGBA sample with clamp-to-edge addressing.
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = (image.width() - 1) as f64;
    let max_y = (image.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
