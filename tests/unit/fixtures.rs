// Shared fixtures: images generated in memory and written to temp dirs

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imagestamp::cache::CacheConfig;
use imagestamp::config::{RouteConfig, RouteKind};
use imagestamp::image::{ImageLimits, Transformation};
use imagestamp::router::RouteHandler;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

pub fn encode(img: RgbaImage, format: ImageFormat) -> Vec<u8> {
    let dynamic = DynamicImage::ImageRgba8(img);
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => dynamic.to_rgb8().write_to(&mut buffer, format).unwrap(),
        _ => dynamic.write_to(&mut buffer, format).unwrap(),
    }
    buffer.into_inner()
}

pub fn write_image(dir: &Path, name: &str, img: RgbaImage, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode(img, format)).unwrap();
    path
}

/// 1000x1000 white JPEG
pub fn base_jpeg(dir: &Path) -> PathBuf {
    write_image(
        dir,
        "image.jpeg",
        RgbaImage::from_pixel(1000, 1000, WHITE),
        ImageFormat::Jpeg,
    )
}

/// 100x100 opaque red PNG
pub fn red_stamp(dir: &Path) -> PathBuf {
    write_image(
        dir,
        "stamp.png",
        RgbaImage::from_pixel(100, 100, RED),
        ImageFormat::Png,
    )
}

/// 50x50 PNG: left half opaque red, right half transparent
pub fn half_tile(dir: &Path) -> PathBuf {
    let tile = RgbaImage::from_fn(50, 50, |x, _| if x < 25 { RED } else { CLEAR });
    write_image(dir, "watermark.png", tile, ImageFormat::Png)
}

pub fn route(path: &str, kind: RouteKind, image: PathBuf, stamp: PathBuf) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        kind,
        image,
        stamp,
        transformation: Transformation::default(),
        top: 0,
        left: 0,
    }
}

pub fn cache(dir: &Path, ttl_seconds: u64) -> CacheConfig {
    CacheConfig {
        enabled: true,
        dir: dir.to_path_buf(),
        ttl_seconds,
    }
}

pub fn handler(route: RouteConfig, cache: CacheConfig) -> RouteHandler {
    RouteHandler::new(route, cache, ImageLimits::default(), true)
}

pub fn is_reddish(p: &Rgba<u8>) -> bool {
    p[0] > 200 && p[1] < 60 && p[2] < 60
}

pub fn is_whitish(p: &Rgba<u8>) -> bool {
    p[0] > 220 && p[1] > 220 && p[2] > 220
}
