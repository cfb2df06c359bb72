// Rendering pipeline tests: decode, transform, composite, encode

use super::fixtures::*;
use image::ImageFormat;
use imagestamp::config::RouteKind;
use imagestamp::error::StampError;
use imagestamp::image::{RasterImage, Stamp, Transformation};
use imagestamp::proxy::RequestContext;
use tempfile::TempDir;

// Test: Stamp route places a resized stamp at (top, left) on the x and y axes
#[test]
fn test_stamp_route_places_resized_stamp() {
    let dir = TempDir::new().unwrap();
    let mut route = route(
        "/stamped.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    route.transformation = Transformation::resize(400, 400);
    route.top = 280;
    route.left = 120;
    let handler = handler(route, cache(dir.path(), 10));

    let rendered = handler
        .render(&RequestContext::from_uri("/stamped.jpeg"))
        .unwrap();
    assert_eq!(rendered.content_type, "image/jpeg");

    let output = image::load_from_memory(&rendered.body).unwrap().to_rgba8();
    assert_eq!(output.dimensions(), (1000, 1000));

    // Stamp covers x in [280, 680), y in [120, 520)
    assert!(is_reddish(output.get_pixel(480, 320)));
    assert!(is_reddish(output.get_pixel(290, 130)));
    assert!(is_reddish(output.get_pixel(670, 510)));
    assert!(is_whitish(output.get_pixel(270, 320)));
    assert!(is_whitish(output.get_pixel(690, 320)));
    assert!(is_whitish(output.get_pixel(480, 110)));
    assert!(is_whitish(output.get_pixel(480, 530)));
}

// Test: Query parameters override the stamp size and placement
#[test]
fn test_stamp_route_query_overrides() {
    let dir = TempDir::new().unwrap();
    let route = route(
        "/stamped.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(dir.path(), 10));

    let ctx = RequestContext::from_uri("/stamped.jpeg?w=200&h=100&top=500&left=600");
    let rendered = handler.render(&ctx).unwrap();
    let output = image::load_from_memory(&rendered.body).unwrap().to_rgba8();

    assert!(is_reddish(output.get_pixel(600, 650)));
    assert!(is_whitish(output.get_pixel(600, 720)));
    assert!(is_whitish(output.get_pixel(450, 650)));
}

// Test: Zero opacity makes the stamp invisible
#[test]
fn test_stamp_with_zero_opacity_leaves_base_unchanged() {
    let dir = TempDir::new().unwrap();
    let route = route(
        "/stamped.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(dir.path(), 10));

    let rendered = handler
        .render(&RequestContext::from_uri("/stamped.jpeg?o=0"))
        .unwrap();
    let output = image::load_from_memory(&rendered.body).unwrap().to_rgba8();
    assert!(is_whitish(output.get_pixel(50, 50)));
}

// Test: Watermark route tiles the stamp over the full width and height
#[test]
fn test_watermark_route_tiles_whole_image() {
    let dir = TempDir::new().unwrap();
    let base = write_image(
        dir.path(),
        "base.png",
        image::RgbaImage::from_pixel(330, 170, WHITE),
        ImageFormat::Png,
    );
    let route = route("/wm.png", RouteKind::Watermark, base, half_tile(dir.path()));
    let handler = handler(route, cache(dir.path(), 10));

    let rendered = handler.render(&RequestContext::from_uri("/wm.png")).unwrap();
    assert_eq!(rendered.content_type, "image/png");

    let output = image::load_from_memory(&rendered.body).unwrap().to_rgba8();
    assert_eq!(output.dimensions(), (330, 170));

    for y in [0, 60, 169] {
        for tile_x in (0..330).step_by(50) {
            assert_eq!(output.get_pixel(tile_x, y), &RED, "x={} y={}", tile_x, y);
            if tile_x + 30 < 330 {
                assert_eq!(output.get_pixel(tile_x + 30, y), &WHITE, "x={} y={}", tile_x + 30, y);
            }
        }
    }
}

// Test: A JPEG stamp is rejected
#[test]
fn test_jpeg_stamp_is_rejected() {
    let dir = TempDir::new().unwrap();
    let jpeg = base_jpeg(dir.path());

    let err = Stamp::new(jpeg.as_path(), None).unwrap_err();
    assert!(matches!(err, StampError::UnsupportedStampFormat { .. }));

    let route = route("/x.jpeg", RouteKind::Stamp, jpeg.clone(), jpeg);
    let handler = handler(route, cache(dir.path(), 10));
    assert!(handler.render(&RequestContext::from_uri("/x.jpeg")).is_err());
}

// Test: Missing base image fails rendering
#[test]
fn test_missing_base_image() {
    let dir = TempDir::new().unwrap();
    let route = route(
        "/x.jpeg",
        RouteKind::Stamp,
        dir.path().join("missing.jpeg"),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(dir.path(), 10));

    let err = handler
        .render(&RequestContext::from_uri("/x.jpeg"))
        .unwrap_err();
    assert!(matches!(err, StampError::NotReadable { .. }));
}

// Test: Decode, stamp and write through the library API
#[test]
fn test_library_round_trip_to_file() {
    let dir = TempDir::new().unwrap();
    let mut image = RasterImage::decode(base_jpeg(dir.path()), None).unwrap();
    let stamp = Stamp::new(
        red_stamp(dir.path()),
        Some(&Transformation::resize(400, 400).with_rotation(90)),
    )
    .unwrap();
    image.place_stamp(stamp, 280, 120).unwrap();

    let out = dir.path().join("out.jpeg");
    let file = image.write_to_destination(out.clone()).unwrap();
    assert_eq!(file.path(), out.as_path());
    assert_eq!(file.mime_type().unwrap(), "image/jpeg");

    let again = RasterImage::decode(out, None).unwrap();
    assert_eq!(again.dimensions(), (1000, 1000));
}
