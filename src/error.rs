//! Error types for the stamping pipeline
//!
//! Every failure of decode, transform, composite and encode surfaces as a
//! `StampError`. The request proxy is the only place where these are
//! downgraded to a 404 response.

use thiserror::Error;

/// Errors that can occur while loading, transforming or writing images
#[derive(Error, Debug)]
pub enum StampError {
    // === Resolution Errors ===
    /// The source or destination cannot be resolved to a usable file
    #[error("Image cannot be initialized from: {location}")]
    CannotInitialize { location: String },

    /// The file exists (or should exist) but cannot be read
    #[error("Path is not readable: {path}")]
    NotReadable { path: String },

    /// The destination cannot be written
    #[error("Path is not writable: {path}")]
    NotWritable { path: String },

    /// The handler produced no response for the request
    #[error("Nothing found for: {path}")]
    NotFound { path: String },

    // === Format Errors ===
    /// The detected media type is neither JPEG nor PNG
    #[error("Unsupported image format '{mime}' of {location}")]
    UnsupportedFormat { mime: String, location: String },

    /// A stamp was loaded from something other than a PNG
    #[error("Stamp must be a PNG image, got {format}")]
    UnsupportedStampFormat { format: String },

    /// Two buffers cannot be composited together
    #[error("Incompatible image buffers: {message}")]
    IncompatibleBuffers { message: String },

    // === Codec Errors ===
    /// The bytes claim a supported format but fail to decode
    #[error("Failed to decode {location}: {message}")]
    DecodeFailed { location: String, message: String },

    /// Encoding to the output format failed
    #[error("Failed to encode to {format}: {message}")]
    EncodeFailed { format: String, message: String },

    // === Parameter Errors ===
    /// Requested dimensions are unusable
    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A source, resize target or rotated canvas exceeds the image limits
    #[error("Image {width}x{height} ({pixels} pixels) exceeds the limit of {max_pixels} pixels or the maximum dimensions")]
    ImageTooLarge {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    /// A request parameter could not be interpreted
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StampError {
    /// Maps errors to the HTTP status a direct caller would report.
    ///
    /// The caching proxy ignores this and always answers 404, but it keeps
    /// log lines and diagnostics meaningful.
    pub fn to_http_status(&self) -> u16 {
        match self {
            StampError::CannotInitialize { .. } | StampError::NotFound { .. } => 404,
            StampError::NotReadable { .. } => 403,
            StampError::UnsupportedFormat { .. }
            | StampError::UnsupportedStampFormat { .. }
            | StampError::IncompatibleBuffers { .. } => 415,
            StampError::DecodeFailed { .. }
            | StampError::InvalidDimensions { .. }
            | StampError::InvalidParameter { .. } => 400,
            StampError::ImageTooLarge { .. } => 413,
            StampError::NotWritable { .. }
            | StampError::EncodeFailed { .. }
            | StampError::Io(_) => 500,
        }
    }

    /// True for the format class of errors (unsupported or incompatible data)
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            StampError::UnsupportedFormat { .. }
                | StampError::UnsupportedStampFormat { .. }
                | StampError::IncompatibleBuffers { .. }
        )
    }

    pub fn cannot_initialize(location: impl Into<String>) -> Self {
        StampError::CannotInitialize {
            location: location.into(),
        }
    }

    pub fn unsupported_format(mime: impl Into<String>, location: impl Into<String>) -> Self {
        StampError::UnsupportedFormat {
            mime: mime.into(),
            location: location.into(),
        }
    }

    pub fn decode_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        StampError::DecodeFailed {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        StampError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        StampError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
