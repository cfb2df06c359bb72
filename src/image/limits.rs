//! Size limits guarding every buffer the pipeline allocates.
//!
//! Sources are checked from their header before the full decode, so an image
//! bomb is rejected without allocating its pixels. Resize targets and rotated
//! canvases are checked before the new buffer is created.

use serde::{Deserialize, Serialize};

use crate::error::StampError;

/// Dimension and pixel-count limits for decoded and transformed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLimits {
    /// Maximum width a transformation may resize to
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    /// Maximum height a transformation may resize to
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Maximum width of a decoded source image
    #[serde(default = "default_max_source_width")]
    pub max_source_width: u32,
    /// Maximum height of a decoded source image
    #[serde(default = "default_max_source_height")]
    pub max_source_height: u32,
    /// Maximum pixel count of any buffer (decoded, resized or rotated)
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_source_width: default_max_source_width(),
            max_source_height: default_max_source_height(),
            max_pixels: default_max_pixels(),
        }
    }
}

fn default_max_width() -> u32 {
    4096
}

fn default_max_height() -> u32 {
    4096
}

fn default_max_source_width() -> u32 {
    10000
}

fn default_max_source_height() -> u32 {
    10000
}

fn default_max_pixels() -> u64 {
    100_000_000 // 100 megapixels
}

impl ImageLimits {
    /// Validate the dimensions read from a source header.
    pub fn check_source(&self, width: u32, height: u32) -> Result<(), StampError> {
        if width > self.max_source_width || height > self.max_source_height {
            return Err(self.too_large(width, height));
        }
        self.check_canvas(width, height)
    }

    /// Validate a resize target.
    pub fn check_target(&self, width: u32, height: u32) -> Result<(), StampError> {
        if width > self.max_width || height > self.max_height {
            return Err(self.too_large(width, height));
        }
        self.check_canvas(width, height)
    }

    /// Validate the pixel count of a buffer about to be allocated.
    pub fn check_canvas(&self, width: u32, height: u32) -> Result<(), StampError> {
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(self.too_large(width, height));
        }
        Ok(())
    }

    fn too_large(&self, width: u32, height: u32) -> StampError {
        StampError::ImageTooLarge {
            width,
            height,
            pixels: u64::from(width) * u64::from(height),
            max_pixels: self.max_pixels,
        }
    }
}
