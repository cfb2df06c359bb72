// Proxy module - cache-aside request handling
//
// A `CachingHandler` renders a response for a request. `serve` puts a file
// cache with a time to live in front of it: fresh artifacts are returned as
// they are, everything else is rendered, written back and returned.

pub mod request;
pub mod special_endpoints;

use bytes::Bytes;
use std::time::{Duration, SystemTime};

use crate::cache::CacheArtifact;
use crate::error::StampError;
use crate::metrics::StampMetrics;

pub use request::RequestContext;

/// Encoded output of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Rendered {
    pub fn new(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            body,
        }
    }
}

/// A request handler that can be served through the render cache.
pub trait CachingHandler {
    /// Where the rendering for this request is cached, if anywhere
    fn resolve_cache_location(&self, request: &RequestContext) -> Option<CacheArtifact>;

    /// How long a cached rendering stays valid
    fn cache_time_to_live(&self) -> Duration;

    /// Render the response body.
    ///
    /// `Ok(None)` means there is nothing to serve for this request.
    fn handle(&self, request: &RequestContext) -> Result<Option<Rendered>, StampError>;

    /// When true, swallowed errors are reported to the diagnostic sink
    fn is_debug(&self) -> bool {
        false
    }
}

/// Receives errors that do not change the response
pub trait DiagnosticSink {
    fn report(&self, error: &StampError);
}

/// Reports diagnostics as `tracing` error events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, error: &StampError) {
        tracing::error!(error = %error, status = error.to_http_status(), "Request diagnostic");
    }
}

/// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    CacheHit,
    Generated,
    NotFound,
    Failed,
}

impl ProxyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyOutcome::CacheHit => "cache_hit",
            ProxyOutcome::Generated => "generated",
            ProxyOutcome::NotFound => "not_found",
            ProxyOutcome::Failed => "failed",
        }
    }
}

/// The single response produced for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub outcome: ProxyOutcome,
}

impl ProxyResponse {
    pub fn ok(content_type: impl Into<String>, body: impl Into<Bytes>, outcome: ProxyOutcome) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
            outcome,
        }
    }

    /// 404 with an empty body
    pub fn not_found(outcome: ProxyOutcome) -> Self {
        Self {
            status: 404,
            content_type: None,
            body: Bytes::new(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Answer a request through the render cache.
pub fn serve<H>(handler: &H, request: &RequestContext, diagnostics: &dyn DiagnosticSink) -> ProxyResponse
where
    H: CachingHandler + ?Sized,
{
    let metrics = StampMetrics::global();
    let debug = handler.is_debug();
    let report = |error: &StampError| {
        if debug {
            diagnostics.report(error);
        }
    };

    let artifact = handler.resolve_cache_location(request);
    if let Some(artifact) = &artifact {
        match read_fresh(artifact, handler.cache_time_to_live()) {
            Ok(Some((content_type, body))) => {
                metrics.cache_hits.inc();
                tracing::debug!(path = %request.path(), artifact = %artifact.path().display(), "Cache hit");
                return ProxyResponse::ok(content_type, body, ProxyOutcome::CacheHit);
            }
            Ok(None) => {
                tracing::debug!(path = %request.path(), artifact = %artifact.path().display(), "Cache miss");
            }
            Err(e) => {
                tracing::debug!(path = %request.path(), error = %e, "Cache check failed");
                report(&e);
            }
        }
    }
    metrics.cache_misses.inc();

    let result = {
        let _timer = metrics.start_render_timer();
        handler.handle(request)
    };

    match result {
        Ok(Some(rendered)) => {
            if let Some(artifact) = &artifact {
                match artifact.store(&rendered.body) {
                    Ok(()) => metrics.cache_writes.inc(),
                    Err(e) => {
                        metrics.cache_write_errors.inc();
                        tracing::warn!(
                            artifact = %artifact.path().display(),
                            error = %e,
                            "Failed to write cache artifact"
                        );
                        report(&e);
                    }
                }
            }
            ProxyResponse::ok(rendered.content_type, rendered.body, ProxyOutcome::Generated)
        }
        Ok(None) => ProxyResponse::not_found(ProxyOutcome::NotFound),
        Err(e) => {
            tracing::debug!(path = %request.path(), error = %e, "Rendering failed");
            report(&e);
            ProxyResponse::not_found(ProxyOutcome::Failed)
        }
    }
}

fn read_fresh(artifact: &CacheArtifact, ttl: Duration) -> Result<Option<(String, Vec<u8>)>, StampError> {
    if !artifact.is_fresh(ttl, SystemTime::now())? {
        return Ok(None);
    }
    let body = artifact.read()?;
    let content_type = crate::source::sniff_mime(&body).to_string();
    Ok(Some((content_type, body)))
}
