//! Compositing a stamp onto a base image.
//!
//! Two operations are supported:
//!
//! - [`RasterImage::place_stamp`] blits the stamp once at an offset
//! - [`RasterImage::tile_watermark`] repeats the stamp over the whole image
//!
//! Both consume the stamp; its buffer is released once blitted. Stamp pixels
//! are blended over the base with the Porter-Duff "over" operator.

use image::RgbaImage;

use super::ops::blend_pixels;
use super::raster::RasterImage;
use super::stamp::Stamp;
use crate::error::StampError;

impl RasterImage {
    /// Place the stamp at an offset.
    ///
    /// The stamp is copied at its own size; any scaling must already have
    /// been applied through its transformation. The first offset moves the
    /// stamp along the x axis and the second along the y axis. Parts falling
    /// outside the base are clipped.
    pub fn place_stamp(&mut self, stamp: Stamp, top: i32, left: i32) -> Result<(), StampError> {
        let overlay = stamp.into_image().into_buffer();
        ensure_drawable(&overlay)?;

        blit(self.buffer_mut(), &overlay, top, left);

        tracing::debug!(
            x = top,
            y = left,
            stamp_width = overlay.width(),
            stamp_height = overlay.height(),
            "Placed stamp"
        );
        Ok(())
    }

    /// Fill the whole image with the stamp repeated as a tile.
    ///
    /// Tiles are anchored at the top-left corner and cover the full
    /// width × height extent.
    pub fn tile_watermark(&mut self, stamp: Stamp) -> Result<(), StampError> {
        let tile = stamp.into_image().into_buffer();
        ensure_drawable(&tile)?;

        let (tile_w, tile_h) = tile.dimensions();
        for (x, y, pixel) in self.buffer_mut().enumerate_pixels_mut() {
            let fg = *tile.get_pixel(x % tile_w, y % tile_h);
            *pixel = blend_pixels(*pixel, fg);
        }

        tracing::debug!(
            width = self.width(),
            height = self.height(),
            tile_width = tile_w,
            tile_height = tile_h,
            "Tiled watermark"
        );
        Ok(())
    }
}

fn ensure_drawable(overlay: &RgbaImage) -> Result<(), StampError> {
    if overlay.width() == 0 || overlay.height() == 0 {
        return Err(StampError::IncompatibleBuffers {
            message: format!(
                "stamp buffer is {}x{}",
                overlay.width(),
                overlay.height()
            ),
        });
    }
    Ok(())
}

/// Copy `overlay` onto `target` with its top-left corner at (x, y).
fn blit(target: &mut RgbaImage, overlay: &RgbaImage, x: i32, y: i32) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;
    let (x, y) = (i64::from(x), i64::from(y));

    // Calculate the visible region (clamp to target bounds)
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + overlay.width() as i64).min(target_width);
    let y_end = (y + overlay.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let fg = *overlay.get_pixel((tx - x) as u32, (ty - y) as u32);
            let bg = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(tx as u32, ty as u32, blend_pixels(bg, fg));
        }
    }
}
