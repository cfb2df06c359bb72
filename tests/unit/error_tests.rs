// Error classification tests

use imagestamp::error::StampError;
use imagestamp::image::RasterImage;
use tempfile::TempDir;

// Test: Each failure surfaces as a distinct error kind
#[test]
fn test_decode_failures_by_kind() {
    let dir = TempDir::new().unwrap();

    let err = RasterImage::decode("", None).unwrap_err();
    assert!(matches!(err, StampError::CannotInitialize { .. }));

    let err = RasterImage::decode(dir.path().join("missing.png"), None).unwrap_err();
    assert!(matches!(err, StampError::NotReadable { .. }));
    assert_eq!(err.to_http_status(), 403);

    let text = dir.path().join("notes.png");
    std::fs::write(&text, "not an image").unwrap();
    let err = RasterImage::decode(text, None).unwrap_err();
    assert!(
        matches!(err, StampError::UnsupportedFormat { ref mime, .. } if mime == "text/plain")
    );
    assert!(err.is_format_error());
    assert_eq!(err.to_http_status(), 415);
}

// Test: Error messages name the offending location
#[test]
fn test_error_messages_include_location() {
    let err = StampError::unsupported_format("text/plain", "/srv/notes.png");
    let message = err.to_string();
    assert!(message.contains("text/plain"));
    assert!(message.contains("/srv/notes.png"));

    let err = StampError::invalid_parameter("w", "'abc' is not a valid number");
    assert_eq!(err.to_http_status(), 400);
    assert!(err.to_string().contains("'w'"));
}
