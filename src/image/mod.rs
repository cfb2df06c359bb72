//! Image pipeline: decode, transform, composite, encode.
//!
//! ```no_run
//! use imagestamp::image::{RasterImage, Stamp, Transformation};
//!
//! # fn main() -> Result<(), imagestamp::error::StampError> {
//! let mut image = RasterImage::decode("photo.jpeg", None)?;
//! let stamp = Stamp::new("logo.png", Some(&Transformation::resize(400, 400)))?;
//! image.place_stamp(stamp, 280, 120)?;
//! image.write_to_destination("stamped.jpeg")?;
//! # Ok(())
//! # }
//! ```

pub mod compositor;
pub mod limits;
pub mod ops;
pub mod raster;
pub mod stamp;
pub mod transformation;

pub use limits::ImageLimits;
pub use raster::{ImageFormat, RasterImage, DEFAULT_JPEG_QUALITY};
pub use stamp::Stamp;
pub use transformation::Transformation;
