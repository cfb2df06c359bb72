//! Route configuration types.
//!
//! Each route maps one request path to a base image and a stamp:
//!
//! ```yaml
//! routes:
//!   - path: /stamped/photo.jpg
//!     kind: stamp
//!     image: /srv/images/photo.jpg
//!     stamp: /srv/images/logo.png
//!     top: 280
//!     left: 120
//!     transformation:
//!       width: 400
//!       height: 400
//!       opacity: 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::image::Transformation;

/// How the stamp is combined with the base image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Placed once at (`top`, `left`)
    Stamp,
    /// Tiled over the whole image
    Watermark,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Exact request path, e.g. `/stamped/photo.jpg`
    pub path: String,
    pub kind: RouteKind,
    /// Base image
    pub image: PathBuf,
    /// Overlay image; must be a PNG
    pub stamp: PathBuf,
    /// Applied to the stamp before compositing
    #[serde(default)]
    pub transformation: Transformation,
    /// Offset along the x axis (stamp routes only)
    #[serde(default)]
    pub top: i32,
    /// Offset along the y axis (stamp routes only)
    #[serde(default)]
    pub left: i32,
}
