//! Pixel-level primitives behind the raster transformations.
//!
//! All functions take and return straight (non-premultiplied) RGBA8 buffers
//! and return a new buffer when the geometry changes.

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::{imageops, Rgba, RgbaImage};
use std::num::NonZeroU32;

use crate::error::StampError;

/// Largest value on the 7-bit alpha scale (fully transparent)
pub const ALPHA7_MAX: u8 = 127;

/// Fully transparent fill for areas exposed by rotation
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Convert 8-bit alpha (255 = opaque) to the 7-bit scale (0 = opaque).
pub fn alpha7_from_alpha8(alpha: u8) -> u8 {
    ALPHA7_MAX - (alpha >> 1)
}

/// Convert 7-bit alpha (0 = opaque, 127 = transparent) back to 8-bit.
pub fn alpha8_from_alpha7(alpha: u8) -> u8 {
    let alpha = alpha.min(ALPHA7_MAX);
    255 - ((alpha << 1) + (alpha >> 6))
}

/// Scale the opacity of one pixel's alpha on the 7-bit scale.
pub fn scale_alpha7(alpha7: u8, opacity: f32) -> u8 {
    let visible = f32::from(ALPHA7_MAX - alpha7.min(ALPHA7_MAX));
    let scaled = (opacity * visible).round().clamp(0.0, f32::from(ALPHA7_MAX)) as u8;
    ALPHA7_MAX - scaled
}

/// Rewrite every pixel's alpha with the given opacity, RGB untouched.
pub fn apply_opacity(buffer: &mut RgbaImage, opacity: f32) {
    for pixel in buffer.pixels_mut() {
        let alpha7 = scale_alpha7(alpha7_from_alpha8(pixel[3]), opacity);
        pixel[3] = alpha8_from_alpha7(alpha7);
    }
}

/// Resize using fast-image-resize with a Lanczos3 filter.
///
/// Resampling runs on premultiplied alpha so transparent pixels do not bleed
/// their colour into visible neighbours.
pub fn resize_buffer(
    buffer: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<RgbaImage, StampError> {
    let invalid = || StampError::InvalidDimensions {
        width: target_w,
        height: target_h,
    };

    let src_width = NonZeroU32::new(buffer.width()).ok_or_else(invalid)?;
    let src_height = NonZeroU32::new(buffer.height()).ok_or_else(invalid)?;
    let dst_width = NonZeroU32::new(target_w).ok_or_else(invalid)?;
    let dst_height = NonZeroU32::new(target_h).ok_or_else(invalid)?;

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        buffer.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| {
        StampError::IncompatibleBuffers {
            message: format!("Failed to create source image: {:?}", e),
        }
    })?;

    let alpha_mul_div = MulDiv::default();
    alpha_mul_div
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| StampError::IncompatibleBuffers {
            message: format!("Failed to premultiply alpha: {:?}", e),
        })?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| StampError::IncompatibleBuffers {
            message: format!("Resize operation failed: {:?}", e),
        })?;

    alpha_mul_div
        .divide_alpha_inplace(&mut dst_image.view_mut())
        .map_err(|e| StampError::IncompatibleBuffers {
            message: format!("Failed to restore straight alpha: {:?}", e),
        })?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec()).ok_or_else(|| {
        StampError::IncompatibleBuffers {
            message: "Failed to create output image buffer".to_string(),
        }
    })
}

/// Canvas size after rotating a `width` x `height` buffer by `degrees`.
pub fn rotated_dimensions(width: u32, height: u32, degrees: i32) -> (u32, u32) {
    match degrees.rem_euclid(360) {
        0 | 180 => (width, height),
        90 | 270 => (height, width),
        other => {
            let (w, h) = (f64::from(width), f64::from(height));
            let (sin, cos) = f64::from(other).to_radians().sin_cos();
            // Rotated bounding box; `as` saturates on overflow
            let out_w = (w * cos.abs() + h * sin.abs()).round().max(1.0) as u32;
            let out_h = (w * sin.abs() + h * cos.abs()).round().max(1.0) as u32;
            (out_w, out_h)
        }
    }
}

/// Rotate anti-clockwise by `degrees` (already reduced to `[0, 360)`).
///
/// The canvas grows to the rotated bounding box; uncovered corners are
/// transparent. Right angles are exact pixel moves.
pub fn rotate_buffer(buffer: &RgbaImage, degrees: i32) -> RgbaImage {
    match degrees.rem_euclid(360) {
        0 => buffer.clone(),
        90 => imageops::rotate270(buffer),
        180 => imageops::rotate180(buffer),
        270 => imageops::rotate90(buffer),
        other => rotate_arbitrary(buffer, other),
    }
}

fn rotate_arbitrary(buffer: &RgbaImage, degrees: i32) -> RgbaImage {
    let (width, height) = (f64::from(buffer.width()), f64::from(buffer.height()));
    let (sin, cos) = f64::from(degrees).to_radians().sin_cos();
    let (out_w, out_h) = rotated_dimensions(buffer.width(), buffer.height(), degrees);

    let (cx, cy) = (width / 2.0, height / 2.0);
    let (ocx, ocy) = (f64::from(out_w) / 2.0, f64::from(out_h) / 2.0);

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        // Inverse mapping from the output pixel centre back into the source
        let dx = f64::from(x) + 0.5 - ocx;
        let dy = f64::from(y) + 0.5 - ocy;
        let sx = dx * cos - dy * sin + cx - 0.5;
        let sy = dx * sin + dy * cos + cy - 0.5;
        sample_bilinear(buffer, sx, sy)
    })
}

/// Bilinear sample with alpha weighting; outside the buffer is transparent.
fn sample_bilinear(buffer: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (w, h) = (i64::from(buffer.width()), i64::from(buffer.height()));

    let taps = [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ];

    let mut acc = [0.0f64; 4];
    for (ox, oy, weight) in taps {
        let px = x0 as i64 + ox;
        let py = y0 as i64 + oy;
        if weight <= 0.0 || px < 0 || py < 0 || px >= w || py >= h {
            continue;
        }
        let p = buffer.get_pixel(px as u32, py as u32);
        let a = f64::from(p[3]) * weight;
        acc[0] += f64::from(p[0]) * a;
        acc[1] += f64::from(p[1]) * a;
        acc[2] += f64::from(p[2]) * a;
        acc[3] += a;
    }

    if acc[3] <= f64::EPSILON {
        return TRANSPARENT;
    }

    let channel = |v: f64| (v / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        acc[3].round().clamp(0.0, 255.0) as u8,
    ])
}

/// Blend two pixels using alpha compositing.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return TRANSPARENT;
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

/// Convert RGBA to RGB by dropping the alpha channel
pub fn rgba_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}
