//! Decoded raster image with its transformation pipeline.
//!
//! Handles the image lifecycle: decode → resize → rotate → opacity → encode

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::io::Reader as ImageReader;
use image::{ColorType, ImageEncoder as _, RgbaImage};
use std::fmt;
use std::io::Cursor;

use super::limits::ImageLimits;
use super::ops;
use super::transformation::Transformation;
use crate::error::StampError;
use crate::source::{sniff_mime, ImageSource, ResolvedFile};

/// Quality used for lossy JPEG output
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Formats that can be decoded and encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Short name, also the mime subtype
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    /// Media type written in `Content-Type`
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    /// Map a detected media type to a supported format
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    fn codec(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned RGBA pixel buffer tagged with the format it came from.
///
/// Resize and rotate replace the buffer; the previous one is dropped in the
/// same call. Every new buffer is checked against the image's limits before
/// it is allocated.
///
/// Transformations overwrite pixels; blending only happens when a stamp is
/// composited onto the image.
pub struct RasterImage {
    buffer: RgbaImage,
    format: ImageFormat,
    limits: ImageLimits,
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("dimensions", &self.buffer.dimensions())
            .field("format", &self.format)
            .field("limits", &self.limits)
            .finish()
    }
}

impl RasterImage {
    /// Decode an image from a file with the default limits.
    ///
    /// The optional transformation is applied right after decoding, in the
    /// order resize, rotate, opacity.
    pub fn decode(
        source: impl Into<ImageSource>,
        transformation: Option<&Transformation>,
    ) -> Result<Self, StampError> {
        Self::decode_with_limits(source, transformation, ImageLimits::default())
    }

    /// Decode an image from a file, rejecting sources and transformations
    /// that exceed `limits`.
    pub fn decode_with_limits(
        source: impl Into<ImageSource>,
        transformation: Option<&Transformation>,
        limits: ImageLimits,
    ) -> Result<Self, StampError> {
        let file = source.into().resolve()?;
        if !file.is_readable() {
            return Err(StampError::NotReadable {
                path: file.display(),
            });
        }

        let data = file.read()?;
        Self::from_bytes_with_limits(&data, &file.display(), transformation, limits)
    }

    /// Decode an image held in memory. `location` is only used in errors.
    pub fn from_bytes(
        data: &[u8],
        location: &str,
        transformation: Option<&Transformation>,
    ) -> Result<Self, StampError> {
        Self::from_bytes_with_limits(data, location, transformation, ImageLimits::default())
    }

    /// Decode an image held in memory, checking the header dimensions
    /// against `limits` before the pixels are decoded.
    pub fn from_bytes_with_limits(
        data: &[u8],
        location: &str,
        transformation: Option<&Transformation>,
        limits: ImageLimits,
    ) -> Result<Self, StampError> {
        let mime = sniff_mime(data);
        let format = ImageFormat::from_mime(mime)
            .ok_or_else(|| StampError::unsupported_format(mime, location))?;

        let (width, height) = ImageReader::with_format(Cursor::new(data), format.codec())
            .into_dimensions()
            .map_err(|e| StampError::decode_failed(location, e.to_string()))?;
        limits.check_source(width, height)?;

        let decoded = image::load_from_memory_with_format(data, format.codec())
            .map_err(|e| StampError::decode_failed(location, e.to_string()))?;

        let mut image = Self::from_buffer(decoded.to_rgba8(), format).with_limits(limits);
        tracing::debug!(
            location = %location,
            format = %format,
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );

        if let Some(transformation) = transformation {
            image.apply(transformation)?;
        }

        Ok(image)
    }

    /// Wrap an existing buffer with the default limits.
    pub fn from_buffer(buffer: RgbaImage, format: ImageFormat) -> Self {
        Self {
            buffer,
            format,
            limits: ImageLimits::default(),
        }
    }

    /// Replace the limits checked by later resizes and rotations.
    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Apply a transformation: resize, then rotate, then opacity.
    pub fn apply(&mut self, transformation: &Transformation) -> Result<(), StampError> {
        self.resize(transformation.width(), transformation.height())?;
        self.rotate(transformation.rotation())?;
        self.set_opacity(transformation.opacity());
        Ok(())
    }

    /// Resample to the target size.
    ///
    /// Skipped unless both dimensions are given and at least one of them
    /// differs from the current size. Targets above the limits fail with
    /// `ImageTooLarge`.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) -> Result<(), StampError> {
        let (Some(width), Some(height)) = (width, height) else {
            return Ok(());
        };
        if (width, height) == self.dimensions() {
            return Ok(());
        }

        self.limits.check_target(width, height)?;
        self.buffer = ops::resize_buffer(&self.buffer, width, height)?;
        Ok(())
    }

    /// Rotate anti-clockwise, exposing transparent corners.
    ///
    /// Fails with `ImageTooLarge` when the rotated bounding box exceeds the
    /// pixel limit.
    pub fn rotate(&mut self, degrees: Option<i32>) -> Result<(), StampError> {
        let degrees = match degrees.map(|d| d.rem_euclid(360)) {
            None | Some(0) => return Ok(()),
            Some(d) => d,
        };
        let (width, height) = ops::rotated_dimensions(self.width(), self.height(), degrees);
        self.limits.check_canvas(width, height)?;

        self.buffer = ops::rotate_buffer(&self.buffer, degrees);
        Ok(())
    }

    /// Scale every pixel's alpha by `opacity`; no-op when absent or ≥ 1.0.
    pub fn set_opacity(&mut self, opacity: Option<f32>) {
        let opacity = match opacity {
            Some(o) if o < 1.0 => o.max(0.0),
            _ => return,
        };
        ops::apply_opacity(&mut self.buffer, opacity);
    }

    /// Encode the buffer into its format: JPEG drops alpha, PNG keeps it.
    pub fn encode(&self) -> Result<Vec<u8>, StampError> {
        let (width, height) = self.dimensions();
        let mut output = Cursor::new(Vec::new());

        match self.format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb_data = ops::rgba_to_rgb(self.buffer.as_raw());
                JpegEncoder::new_with_quality(&mut output, DEFAULT_JPEG_QUALITY)
                    .write_image(&rgb_data, width, height, ColorType::Rgb8)
                    .map_err(|e| StampError::encode_failed("jpeg", e.to_string()))?;
            }
            ImageFormat::Png => {
                PngEncoder::new(&mut output)
                    .write_image(self.buffer.as_raw(), width, height, ColorType::Rgba8)
                    .map_err(|e| StampError::encode_failed("png", e.to_string()))?;
            }
        }

        Ok(output.into_inner())
    }

    /// Encode and write to `destination`, returning the written file.
    pub fn write_to_destination(
        &self,
        destination: impl Into<ImageSource>,
    ) -> Result<ResolvedFile, StampError> {
        let file = destination.into().resolve()?;
        let data = self.encode()?;
        file.write(&data)?;

        tracing::debug!(
            path = %file.display(),
            bytes = data.len(),
            format = %self.format,
            "Wrote image"
        );
        Ok(file)
    }

    /// Pixels in straight RGBA
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Mutable pixels, used by the compositor
    pub fn buffer_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }

    /// Release the image, keeping only its pixels
    pub fn into_buffer(self) -> RgbaImage {
        self.buffer
    }

    /// Format the image was decoded from and will be encoded to
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Limits checked by resize and rotate
    pub fn limits(&self) -> &ImageLimits {
        &self.limits
    }

    /// `"image/" + format`
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.format.as_str())
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// `(width, height)` in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }
}
