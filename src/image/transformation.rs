//! Optional adjustments applied to a decoded image.

use serde::{Deserialize, Serialize};

/// A bundle of optional resize, rotate and opacity adjustments.
///
/// Absent fields mean "leave unchanged". Rotation is always kept in
/// `[0, 360)` and opacity in `[0.0, 1.0]`, whichever way the value was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransformation", into = "RawTransformation")]
pub struct Transformation {
    width: Option<u32>,
    height: Option<u32>,
    rotation: Option<i32>,
    opacity: Option<f32>,
}

impl Transformation {
    /// Build a transformation, normalizing rotation and clamping opacity.
    pub fn new(
        width: Option<u32>,
        height: Option<u32>,
        rotation: Option<i32>,
        opacity: Option<f32>,
    ) -> Self {
        Self {
            width,
            height,
            rotation: rotation.map(normalize_rotation),
            opacity: opacity.map(clamp_opacity),
        }
    }

    /// Resize only
    pub fn resize(width: u32, height: u32) -> Self {
        Self::new(Some(width), Some(height), None, None)
    }

    /// Set both target dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the rotation, reduced modulo 360
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.set_rotation(Some(degrees));
        self
    }

    /// Set the opacity, clamped into `[0.0, 1.0]`
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(Some(opacity));
        self
    }

    /// Target width in pixels
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// Target height in pixels
    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// Anti-clockwise rotation in degrees, in `[0, 360)`
    pub fn rotation(&self) -> Option<i32> {
        self.rotation
    }

    /// Opacity in `[0.0, 1.0]`
    pub fn opacity(&self) -> Option<f32> {
        self.opacity
    }

    pub fn set_width(&mut self, width: Option<u32>) {
        self.width = width;
    }

    pub fn set_height(&mut self, height: Option<u32>) {
        self.height = height;
    }

    /// Replace the rotation; negative values wrap into `[0, 360)`
    pub fn set_rotation(&mut self, degrees: Option<i32>) {
        self.rotation = degrees.map(normalize_rotation);
    }

    /// Replace the opacity; NaN counts as fully opaque
    pub fn set_opacity(&mut self, opacity: Option<f32>) {
        self.opacity = opacity.map(clamp_opacity);
    }

    /// True when applying this transformation changes nothing
    pub fn is_identity(&self) -> bool {
        (self.width.is_none() || self.height.is_none())
            && self.rotation.unwrap_or(0) == 0
            && self.opacity.map_or(true, |o| o >= 1.0)
    }
}

fn normalize_rotation(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        return 1.0;
    }
    opacity.clamp(0.0, 1.0)
}

/// Wire form used for YAML config; normalized on the way in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct RawTransformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    opacity: Option<f32>,
}

impl From<RawTransformation> for Transformation {
    fn from(raw: RawTransformation) -> Self {
        Transformation::new(raw.width, raw.height, raw.rotation, raw.opacity)
    }
}

impl From<Transformation> for RawTransformation {
    fn from(t: Transformation) -> Self {
        RawTransformation {
            width: t.width,
            height: t.height,
            rotation: t.rotation,
            opacity: t.opacity,
        }
    }
}
