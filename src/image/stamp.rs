//! Overlay image placed on top of a base image.

use super::limits::ImageLimits;
use super::raster::{ImageFormat, RasterImage};
use super::transformation::Transformation;
use crate::error::StampError;
use crate::source::ImageSource;

/// A PNG image used as the overlay for stamping and watermarking.
#[derive(Debug)]
pub struct Stamp {
    image: RasterImage,
}

impl Stamp {
    /// Decode a stamp, applying the optional transformation.
    ///
    /// Fails with `UnsupportedStampFormat` unless the source is a PNG.
    pub fn new(
        source: impl Into<ImageSource>,
        transformation: Option<&Transformation>,
    ) -> Result<Self, StampError> {
        Self::from_image(RasterImage::decode(source, transformation)?)
    }

    /// Like [`Stamp::new`], checking the source and transformation against
    /// `limits`.
    pub fn with_limits(
        source: impl Into<ImageSource>,
        transformation: Option<&Transformation>,
        limits: ImageLimits,
    ) -> Result<Self, StampError> {
        Self::from_image(RasterImage::decode_with_limits(
            source,
            transformation,
            limits,
        )?)
    }

    /// Use an already decoded image as a stamp.
    pub fn from_image(image: RasterImage) -> Result<Self, StampError> {
        if image.format() != ImageFormat::Png {
            return Err(StampError::UnsupportedStampFormat {
                format: image.format().to_string(),
            });
        }
        Ok(Self { image })
    }

    /// The decoded, transformed overlay
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Release the stamp for compositing
    pub fn into_image(self) -> RasterImage {
        self.image
    }
}
