//! Per-pixel color math behind the hair-category filters.
//!
//! Channels are handled as `f32` in [0, 1]; alpha passes through untouched.
//! Every adjustment has a neutral parameter set for which it is the exact
//! identity, and [`Adjustment::is_identity`] lets callers skip the pass.

use image::imageops;
use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Reference white for temperature/tint adjustments, in kelvin.
pub const NEUTRAL_TEMPERATURE: f32 = 6500.0;

/// Green gain change per tint unit. 150 units is a strong magenta/green shift.
const TINT_SCALE: f32 = 1.0 / 1000.0;

pub type Rgb = [f32; 3];

/// Parametrized color adjustments offered by the image backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Rotate hue by `angle` radians.
    HueRotation { angle: f32 },
    /// Re-render an image shot under `neutral` (kelvin, tint) as if under `target`.
    TemperatureTint { neutral: (f32, f32), target: (f32, f32) },
    /// Scale channels toward a reference white.
    WhitePoint { color: Rgb },
    /// Diagonal color matrix.
    ChannelScale { scale: Rgb },
    /// Saturation around luma and contrast around mid-gray.
    ColorControls { saturation: f32, contrast: f32 },
    /// Saturation boost weighted toward muted pixels.
    Vibrance { amount: f32 },
    /// Local-luma weighted gain on highlights and shadows.
    HighlightShadow { highlight: f32, shadow: f32, radius: f32 },
}

impl Adjustment {
    pub fn is_identity(&self) -> bool {
        match *self {
            Adjustment::HueRotation { angle } => angle == 0.0,
            Adjustment::TemperatureTint { neutral, target } => neutral == target,
            Adjustment::WhitePoint { color } => color == [1.0; 3],
            Adjustment::ChannelScale { scale } => scale == [1.0; 3],
            Adjustment::ColorControls { saturation, contrast } => saturation == 1.0 && contrast == 1.0,
            Adjustment::Vibrance { amount } => amount == 0.0,
            Adjustment::HighlightShadow { highlight, shadow, .. } => highlight == 1.0 && shadow == 0.0,
        }
    }

    /// Apply to a whole image, producing a new buffer.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        if self.is_identity() {
            return image.clone();
        }

        match *self {
            Adjustment::HueRotation { angle } => {
                let m = hue_rotation_matrix(angle);
                map_rgb(image, |c| mul_matrix(&m, c))
            }
            Adjustment::TemperatureTint { neutral, target } => {
                let gains = temperature_tint_gains(neutral, target);
                map_rgb(image, |c| mul_gains(c, gains))
            }
            Adjustment::WhitePoint { color } => map_rgb(image, |c| mul_gains(c, color)),
            Adjustment::ChannelScale { scale } => map_rgb(image, |c| mul_gains(c, scale)),
            Adjustment::ColorControls { saturation, contrast } => {
                map_rgb(image, |c| color_controls(c, saturation, contrast))
            }
            Adjustment::Vibrance { amount } => map_rgb(image, |c| vibrance(c, amount)),
            Adjustment::HighlightShadow { highlight, shadow, radius } => {
                highlight_shadow(image, highlight, shadow, radius)
            }
        }
    }
}

/// RGB channels of a pixel in [0, 1]. Alpha is dropped.
#[inline]
pub fn to_unit(p: &Rgba<u8>) -> Rgb {
    [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0]
}

/// Clamp to [0, 1] and quantize to a channel byte.
#[inline]
pub fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Rec. 709 relative luminance.
#[inline]
pub fn luminance(c: Rgb) -> f32 {
    LUMA_WEIGHTS[0] * c[0] + LUMA_WEIGHTS[1] * c[1] + LUMA_WEIGHTS[2] * c[2]
}

/// Apply `f` to the RGB channels of every pixel.
pub fn map_rgb<F>(image: &RgbaImage, f: F) -> RgbaImage
where
    F: Fn(Rgb) -> Rgb,
{
    let mut out = image.clone();
    for p in out.pixels_mut() {
        let c = f(to_unit(p));
        p[0] = to_byte(c[0]);
        p[1] = to_byte(c[1]);
        p[2] = to_byte(c[2]);
    }
    out
}

fn mul_gains(c: Rgb, g: Rgb) -> Rgb {
    [c[0] * g[0], c[1] * g[1], c[2] * g[2]]
}

fn mul_matrix(m: &[[f32; 3]; 3], c: Rgb) -> Rgb {
    [
        m[0][0] * c[0] + m[0][1] * c[1] + m[0][2] * c[2],
        m[1][0] * c[0] + m[1][1] * c[1] + m[1][2] * c[2],
        m[2][0] * c[0] + m[2][1] * c[1] + m[2][2] * c[2],
    ]
}

fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Luma-preserving hue rotation matrix. Exactly the identity at 0.
pub fn hue_rotation_matrix(angle: f32) -> [[f32; 3]; 3] {
    let (s, c) = angle.sin_cos();
    [
        [
            0.213 + c * 0.787 - s * 0.213,
            0.715 - c * 0.715 - s * 0.715,
            0.072 - c * 0.072 + s * 0.928,
        ],
        [
            0.213 - c * 0.213 + s * 0.143,
            0.715 + c * 0.285 + s * 0.140,
            0.072 - c * 0.072 - s * 0.283,
        ],
        [
            0.213 - c * 0.213 - s * 0.787,
            0.715 - c * 0.715 + s * 0.715,
            0.072 + c * 0.928 + s * 0.072,
        ],
    ]
}

/// Approximate sRGB color of a blackbody radiator, in [0, 1].
///
/// Curve fit by Tanner Helland, valid from 1000 K to 40000 K.
pub fn kelvin_to_rgb(kelvin: f32) -> Rgb {
    let t = kelvin.clamp(1000.0, 40000.0) / 100.0;

    let r = if t <= 66.0 {
        255.0
    } else {
        329.698_73 * (t - 60.0).powf(-0.133_204_76)
    };
    let g = if t <= 66.0 {
        99.470_8 * t.ln() - 161.119_57
    } else {
        288.122_16 * (t - 60.0).powf(-0.075_514_85)
    };
    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.517_73 * (t - 10.0).ln() - 305.044_8
    };

    [
        (r / 255.0).clamp(0.0, 1.0),
        (g / 255.0).clamp(0.0, 1.0),
        (b / 255.0).clamp(0.0, 1.0),
    ]
}

fn luma_normalized_white(kelvin: f32) -> Rgb {
    let w = kelvin_to_rgb(kelvin);
    let l = luminance(w).max(1e-4);
    [w[0] / l, w[1] / l, w[2] / l]
}

/// Per-channel gains for a (temperature, tint) white balance shift.
///
/// A target below the neutral temperature warms the image, one above cools it.
/// Positive tint pulls green down (toward magenta).
pub fn temperature_tint_gains(neutral: (f32, f32), target: (f32, f32)) -> Rgb {
    let from = luma_normalized_white(neutral.0);
    let to = luma_normalized_white(target.0);
    let tint = (1.0 - (target.1 - neutral.1) * TINT_SCALE).max(0.0);

    // Blue is 0 below ~1900 K; fall back to no change on that channel.
    let gain = |t: f32, f: f32| if f > 1e-4 { t / f } else { 1.0 };
    [gain(to[0], from[0]), gain(to[1], from[1]) * tint, gain(to[2], from[2])]
}

/// Saturation around luma, then contrast around mid-gray.
pub fn color_controls(c: Rgb, saturation: f32, contrast: f32) -> Rgb {
    let l = luminance(c);
    let gray = [l; 3];
    let s = mix(gray, c, saturation);
    [
        (s[0] - 0.5) * contrast + 0.5,
        (s[1] - 0.5) * contrast + 0.5,
        (s[2] - 0.5) * contrast + 0.5,
    ]
}

/// Saturation change that favours low-saturation pixels.
pub fn vibrance(c: Rgb, amount: f32) -> Rgb {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    let sat = max - min;
    let factor = 1.0 + amount * (1.0 - sat);
    let l = luminance(c);
    mix([l; 3], c, factor)
}

/// Hermite step from 0 at `edge0` to 1 at `edge1`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn highlight_shadow(image: &RgbaImage, highlight: f32, shadow: f32, radius: f32) -> RgbaImage {
    let luma = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([to_byte(luminance(to_unit(image.get_pixel(x, y))))])
    });
    let local = if radius > 0.0 {
        imageops::blur(&luma, radius)
    } else {
        luma
    };

    let mut out = image.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        let l = local.get_pixel(x, y)[0] as f32 / 255.0;
        let hi = smoothstep(0.5, 1.0, l);
        let lo = 1.0 - smoothstep(0.0, 0.5, l);
        let gain = (1.0 + (highlight - 1.0) * hi) * (1.0 + shadow * lo);

        let c = to_unit(p);
        p[0] = to_byte(c[0] * gain);
        p[1] = to_byte(c[1] * gain);
        p[2] = to_byte(c[2] * gain);
    }
    out
}

/// Recolor toward `target` at each pixel's own luminance, mixed by `strength`.
pub fn grade_toward(c: Rgb, target: Rgb, strength: f32) -> Rgb {
    let target_luma = luminance(target).max(1e-4);
    let k = luminance(c) / target_luma;
    let recolored = [
        (target[0] * k).clamp(0.0, 1.0),
        (target[1] * k).clamp(0.0, 1.0),
        (target[2] * k).clamp(0.0, 1.0),
    ];
    mix(c, recolored, strength.clamp(0.0, 1.0))
}
