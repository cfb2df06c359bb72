//! Config-driven stamp and watermark handler.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CacheArtifact, CacheConfig};
use crate::config::{RouteConfig, RouteKind};
use crate::error::StampError;
use crate::image::{ImageLimits, RasterImage, Stamp, Transformation};
use crate::proxy::{CachingHandler, Rendered, RequestContext};

/// Query parameters that change the rendering
pub const PARAM_WIDTH: &str = "w";
pub const PARAM_HEIGHT: &str = "h";
pub const PARAM_ROTATION: &str = "r";
pub const PARAM_OPACITY: &str = "o";
pub const PARAM_TOP: &str = "top";
pub const PARAM_LEFT: &str = "left";

const OVERRIDE_PARAMS: [&str; 6] = [
    PARAM_WIDTH,
    PARAM_HEIGHT,
    PARAM_ROTATION,
    PARAM_OPACITY,
    PARAM_TOP,
    PARAM_LEFT,
];

/// Renders one configured route.
#[derive(Debug, Clone)]
pub struct RouteHandler {
    route: RouteConfig,
    cache: CacheConfig,
    limits: ImageLimits,
    debug: bool,
}

impl RouteHandler {
    pub fn new(route: RouteConfig, cache: CacheConfig, limits: ImageLimits, debug: bool) -> Self {
        Self {
            route,
            cache,
            limits,
            debug,
        }
    }

    /// The route this handler renders
    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    /// The route's stamp transformation with query overrides applied.
    ///
    /// `w` and `h` must lie in `1..=max_width` and `1..=max_height`.
    pub fn stamp_transformation(
        &self,
        request: &RequestContext,
    ) -> Result<Transformation, StampError> {
        let mut transformation = self.route.transformation;

        if let Some(width) = parse_param::<u32>(request, PARAM_WIDTH)? {
            transformation.set_width(Some(within(PARAM_WIDTH, width, self.limits.max_width)?));
        }
        if let Some(height) = parse_param::<u32>(request, PARAM_HEIGHT)? {
            transformation.set_height(Some(within(
                PARAM_HEIGHT,
                height,
                self.limits.max_height,
            )?));
        }
        if let Some(rotation) = parse_param::<i32>(request, PARAM_ROTATION)? {
            transformation.set_rotation(Some(rotation));
        }
        if let Some(opacity) = parse_param::<f32>(request, PARAM_OPACITY)? {
            if !opacity.is_finite() {
                return Err(StampError::invalid_parameter(
                    PARAM_OPACITY,
                    "must be a finite number",
                ));
            }
            transformation.set_opacity(Some(opacity));
        }

        Ok(transformation)
    }

    /// Stamp offsets `(top, left)` with query overrides applied.
    pub fn placement(&self, request: &RequestContext) -> Result<(i32, i32), StampError> {
        let top = parse_param(request, PARAM_TOP)?.unwrap_or(self.route.top);
        let left = parse_param(request, PARAM_LEFT)?.unwrap_or(self.route.left);
        Ok((top, left))
    }

    /// Decode, composite and encode the image for this request.
    pub fn render(&self, request: &RequestContext) -> Result<Rendered, StampError> {
        let transformation = self.stamp_transformation(request)?;

        let mut image =
            RasterImage::decode_with_limits(self.route.image.as_path(), None, self.limits)?;
        let stamp = Stamp::with_limits(
            self.route.stamp.as_path(),
            Some(&transformation),
            self.limits,
        )?;

        match self.route.kind {
            RouteKind::Stamp => {
                let (top, left) = self.placement(request)?;
                image.place_stamp(stamp, top, left)?;
            }
            RouteKind::Watermark => image.tile_watermark(stamp)?,
        }

        let body = image.encode()?;
        tracing::debug!(
            path = %request.path(),
            kind = ?self.route.kind,
            format = %image.format(),
            bytes = body.len(),
            "Rendered image"
        );
        Ok(Rendered::new(image.mime_type(), body))
    }

    /// Parameters that take part in rendering, used as the cache key
    fn cache_parameters(request: &RequestContext) -> BTreeMap<String, String> {
        request
            .parameters()
            .iter()
            .filter(|(name, _)| OVERRIDE_PARAMS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl CachingHandler for RouteHandler {
    fn resolve_cache_location(&self, request: &RequestContext) -> Option<CacheArtifact> {
        if !self.cache.enabled {
            return None;
        }
        let artifact = CacheArtifact::for_request(
            &self.cache.dir,
            request.path(),
            &Self::cache_parameters(request),
        );
        if artifact.is_none() {
            tracing::debug!(path = %request.path(), "Request path not cacheable, bypassing cache");
        }
        artifact
    }

    fn cache_time_to_live(&self) -> Duration {
        self.cache.ttl()
    }

    fn handle(&self, request: &RequestContext) -> Result<Option<Rendered>, StampError> {
        if request.path() != self.route.path {
            return Ok(None);
        }
        self.render(request).map(Some)
    }

    fn is_debug(&self) -> bool {
        self.debug
    }
}

fn parse_param<T: FromStr>(request: &RequestContext, name: &str) -> Result<Option<T>, StampError> {
    match request.parameter(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            StampError::invalid_parameter(name, format!("'{}' is not a valid number", raw))
        }),
    }
}

fn within(name: &str, value: u32, max: u32) -> Result<u32, StampError> {
    if value == 0 {
        return Err(StampError::invalid_parameter(name, "must be greater than 0"));
    }
    if value > max {
        return Err(StampError::invalid_parameter(
            name,
            format!("must not exceed {}", max),
        ));
    }
    Ok(value)
}
