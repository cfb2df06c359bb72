// Configuration loading tests: file -> validated config -> router

use imagestamp::config::{Config, ConfigError, RouteKind};
use imagestamp::router::Router;
use imagestamp::server::StampProxy;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// Test: A full configuration file loads, validates and builds the router
#[test]
fn test_full_config_builds_router() {
    std::env::set_var("IMAGESTAMP_IT_ASSETS", "/srv/assets");
    let file = write_config(
        r#"
server:
  address: "127.0.0.1"
  port: 9090
  threads: 2

cache:
  enabled: true
  dir: /tmp/imagestamp-it
  ttl_seconds: 10

logging:
  level: debug
  format: text

debug: true

routes:
  - path: /stamped/image.jpeg
    kind: stamp
    image: ${IMAGESTAMP_IT_ASSETS}/image.jpeg
    stamp: ${IMAGESTAMP_IT_ASSETS}/stamp.png
    top: 280
    left: 120
    transformation:
      width: 400
      height: 400
  - path: /watermarked/image.jpeg
    kind: watermark
    image: ${IMAGESTAMP_IT_ASSETS}/image.jpeg
    stamp: ${IMAGESTAMP_IT_ASSETS}/watermark.png
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.server.listen_address(), "127.0.0.1:9090");
    assert!(config.debug);
    assert_eq!(
        config.routes[0].image,
        std::path::Path::new("/srv/assets/image.jpeg")
    );

    let router = Router::new(&config);
    assert_eq!(router.len(), 2);
    let watermark = router.route("/watermarked/image.jpeg").unwrap();
    assert_eq!(watermark.route().kind, RouteKind::Watermark);

    let proxy = StampProxy::new(&config);
    assert_eq!(proxy.router().len(), 2);
}

// Test: Validation errors surface as ConfigError::Invalid
#[test]
fn test_invalid_config_is_rejected() {
    let file = write_config(
        r#"
routes:
  - path: /metrics
    kind: stamp
    image: a.jpeg
    stamp: b.png
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("/metrics"));
}

// Test: A field with the wrong type is a parse error
#[test]
fn test_wrong_field_type_is_parse_error() {
    let file = write_config("server:\n  port: not-a-number\n");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
