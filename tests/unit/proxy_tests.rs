// Cache-aside serving tests with real routes and a temp cache directory

use super::fixtures::*;
use imagestamp::config::RouteKind;
use imagestamp::proxy::{serve, CachingHandler, ProxyOutcome, RequestContext, TracingDiagnostics};
use std::fs::File;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn age_file(path: &std::path::Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

// Test: First request renders and stores, second is served from cache
#[test]
fn test_render_then_cache_hit() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/stamped/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));
    let request = RequestContext::from_uri("/stamped/image.jpeg");

    let first = serve(&handler, &request, &TracingDiagnostics);
    assert_eq!(first.status, 200);
    assert_eq!(first.outcome, ProxyOutcome::Generated);
    assert_eq!(first.content_type.as_deref(), Some("image/jpeg"));

    let artifact = cache_dir.join("stamped/image.jpeg");
    assert_eq!(std::fs::read(&artifact).unwrap(), &first.body[..]);

    let second = serve(&handler, &request, &TracingDiagnostics);
    assert_eq!(second.outcome, ProxyOutcome::CacheHit);
    assert_eq!(second.body, first.body);
    assert_eq!(second.content_type.as_deref(), Some("image/jpeg"));
}

// Test: Artifact one second inside the TTL is served, one second outside is regenerated
#[test]
fn test_ttl_boundaries() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));
    let request = RequestContext::from_uri("/image.jpeg");

    // Seed the cache with a marker that a rendering would never produce
    let artifact = cache_dir.join("image.jpeg");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(&artifact, b"cached marker").unwrap();

    age_file(&artifact, Duration::from_secs(9));
    let response = serve(&handler, &request, &TracingDiagnostics);
    assert_eq!(response.outcome, ProxyOutcome::CacheHit);
    assert_eq!(&response.body[..], b"cached marker");
    assert_eq!(response.content_type.as_deref(), Some("text/plain"));

    age_file(&artifact, Duration::from_secs(11));
    let response = serve(&handler, &request, &TracingDiagnostics);
    assert_eq!(response.outcome, ProxyOutcome::Generated);
    assert_ne!(&response.body[..], b"cached marker");
    assert_eq!(std::fs::read(&artifact).unwrap(), &response.body[..]);
}

// Test: Different override parameters get different cache artifacts
#[test]
fn test_query_parameters_are_cached_separately() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));

    let small = RequestContext::from_uri("/image.jpeg?w=10&h=10");
    let large = RequestContext::from_uri("/image.jpeg?w=300&h=300");

    let small_response = serve(&handler, &small, &TracingDiagnostics);
    let large_response = serve(&handler, &large, &TracingDiagnostics);
    assert_eq!(small_response.outcome, ProxyOutcome::Generated);
    assert_eq!(large_response.outcome, ProxyOutcome::Generated);
    assert_ne!(small_response.body, large_response.body);

    let small_artifact = handler.resolve_cache_location(&small).unwrap();
    let large_artifact = handler.resolve_cache_location(&large).unwrap();
    assert_ne!(small_artifact.path(), large_artifact.path());
    assert!(small_artifact.path().exists());
    assert!(large_artifact.path().exists());

    let again = serve(&handler, &small, &TracingDiagnostics);
    assert_eq!(again.outcome, ProxyOutcome::CacheHit);
    assert_eq!(again.body, small_response.body);
}

// Test: Path traversal requests are rendered but never cached
#[test]
fn test_path_traversal_bypasses_cache() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/../escape.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));
    let request = RequestContext::from_uri("/../escape.jpeg");

    assert!(handler.resolve_cache_location(&request).is_none());

    let response = serve(&handler, &request, &TracingDiagnostics);
    assert_eq!(response.outcome, ProxyOutcome::Generated);
    assert!(!dir.path().join("escape.jpeg").exists());
    assert!(!cache_dir.exists());
}

// Test: Unknown path gives 404 without writing the cache
#[test]
fn test_unmatched_path_is_not_found() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));

    let response = serve(
        &handler,
        &RequestContext::from_uri("/favicon.ico"),
        &TracingDiagnostics,
    );
    assert_eq!(response.status, 404);
    assert_eq!(response.outcome, ProxyOutcome::NotFound);
    assert!(response.body.is_empty());
    assert!(!cache_dir.join("favicon.ico").exists());
}

// Test: Rendering errors become an empty 404
#[test]
fn test_rendering_error_is_not_found() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Watermark,
        dir.path().join("missing.jpeg"),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));

    let response = serve(
        &handler,
        &RequestContext::from_uri("/image.jpeg"),
        &TracingDiagnostics,
    );
    assert_eq!(response.status, 404);
    assert_eq!(response.outcome, ProxyOutcome::Failed);
    assert!(response.body.is_empty());
    assert!(!cache_dir.join("image.jpeg").exists());

    let response = serve(
        &handler,
        &RequestContext::from_uri("/image.jpeg?w=abc"),
        &TracingDiagnostics,
    );
    assert_eq!(response.outcome, ProxyOutcome::Failed);
}

// Test: Disabled cache renders every time
#[test]
fn test_disabled_cache_always_renders() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let mut config = cache(&cache_dir, 10);
    config.enabled = false;
    let handler = handler(route, config);
    let request = RequestContext::from_uri("/image.jpeg");

    assert_eq!(
        serve(&handler, &request, &TracingDiagnostics).outcome,
        ProxyOutcome::Generated
    );
    assert_eq!(
        serve(&handler, &request, &TracingDiagnostics).outcome,
        ProxyOutcome::Generated
    );
    assert!(!cache_dir.exists());
}

// Test: Oversized resize requests answer 404 instead of allocating
#[test]
fn test_oversized_resize_is_not_found() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let route = route(
        "/image.jpeg",
        RouteKind::Stamp,
        base_jpeg(dir.path()),
        red_stamp(dir.path()),
    );
    let handler = handler(route, cache(&cache_dir, 10));

    for uri in [
        "/image.jpeg?w=4294967295&h=4294967295",
        "/image.jpeg?w=60000&h=60000",
    ] {
        let response = serve(&handler, &RequestContext::from_uri(uri), &TracingDiagnostics);
        assert_eq!(response.status, 404, "{}", uri);
        assert_eq!(response.outcome, ProxyOutcome::Failed, "{}", uri);
        assert!(response.body.is_empty());
    }
    assert!(!cache_dir.exists());
}
