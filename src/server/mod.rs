// Server module - Pingora ProxyHttp service
//
// Every request is answered locally in `request_filter`; nothing is proxied
// upstream. Route rendering runs on the blocking pool.

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorType, Result};
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::StampMetrics;
use crate::proxy::special_endpoints::{self, EndpointResponse};
use crate::proxy::{serve, ProxyResponse, RequestContext, TracingDiagnostics};
use crate::router::{RouteHandler, Router};

/// Per-request state, filled in by `request_filter` and read by `logging`
#[derive(Debug)]
pub struct StampCtx {
    started: Instant,
    method: String,
    path: String,
    outcome: &'static str,
}

impl StampCtx {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            method: String::new(),
            path: String::new(),
            outcome: "unknown",
        }
    }
}

/// What a request resolves to before any I/O
pub enum Dispatch {
    Endpoint(EndpointResponse, &'static str),
    Route(Arc<RouteHandler>, RequestContext),
    NotFound,
}

/// Stamping service answering from configured routes
pub struct StampProxy {
    router: Router,
    /// Start time, for uptime in `/health`
    start_time: Instant,
}

impl StampProxy {
    pub fn new(config: &Config) -> Self {
        Self {
            router: Router::new(config),
            start_time: Instant::now(),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Decide how to answer `method` on the request target `uri`.
    pub fn dispatch(&self, method: &str, uri: &str) -> Dispatch {
        if !is_allowed_method(method) {
            return Dispatch::Endpoint(
                special_endpoints::method_not_allowed(method),
                "method_not_allowed",
            );
        }

        let request = RequestContext::from_uri(uri);
        if let Some(response) = special_endpoints::dispatch(request.path(), self.start_time) {
            let label = if request.path() == special_endpoints::HEALTH_PATH {
                "health"
            } else {
                "metrics"
            };
            return Dispatch::Endpoint(response, label);
        }

        match self.router.route(request.path()) {
            Some(handler) => Dispatch::Route(handler, request),
            None => Dispatch::NotFound,
        }
    }
}

fn is_allowed_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}

/// Response header with content headers set.
fn build_header(status: u16, content_type: Option<&str>, length: usize) -> Result<ResponseHeader> {
    let mut header = ResponseHeader::build(status, None)?;
    if let Some(content_type) = content_type {
        header.insert_header("Content-Type", content_type)?;
    }
    header.insert_header("Content-Length", length.to_string())?;
    Ok(header)
}

async fn write_response(
    session: &mut Session,
    status: u16,
    content_type: Option<&str>,
    body: Bytes,
) -> Result<()> {
    let header = build_header(status, content_type, body.len())?;
    let head_only = session.req_header().method.as_str().eq_ignore_ascii_case("HEAD");

    if head_only || body.is_empty() {
        session
            .write_response_header(Box::new(header), true)
            .await?;
        return Ok(());
    }

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session.write_response_body(Some(body), true).await?;
    Ok(())
}

async fn render(handler: Arc<RouteHandler>, request: RequestContext) -> Result<ProxyResponse> {
    tokio::task::spawn_blocking(move || serve(handler.as_ref(), &request, &TracingDiagnostics))
        .await
        .map_err(|e| Error::because(ErrorType::InternalError, "render task failed", e))
}

#[async_trait]
impl ProxyHttp for StampProxy {
    type CTX = StampCtx;

    fn new_ctx(&self) -> Self::CTX {
        StampCtx::new()
    }

    /// Never reached: `request_filter` answers every request.
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(Error::explain(
            ErrorType::InternalError,
            format!("no upstream for {}", ctx.path),
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        ctx.method = req.method.to_string();
        let uri = req
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri.path().to_string());

        match self.dispatch(&ctx.method, &uri) {
            Dispatch::Endpoint(response, label) => {
                ctx.path = RequestContext::from_uri(&uri).path().to_string();
                ctx.outcome = label;
                write_response(
                    session,
                    response.status,
                    Some(response.content_type),
                    Bytes::from(response.body),
                )
                .await?;
            }
            Dispatch::Route(handler, request) => {
                ctx.path = request.path().to_string();
                let response = render(handler, request).await?;
                ctx.outcome = response.outcome.as_str();
                write_response(
                    session,
                    response.status,
                    response.content_type.as_deref(),
                    response.body,
                )
                .await?;
            }
            Dispatch::NotFound => {
                ctx.path = RequestContext::from_uri(&uri).path().to_string();
                ctx.outcome = "not_routed";
                write_response(session, 404, None, Bytes::new()).await?;
            }
        }

        // Response already sent
        Ok(true)
    }

    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX) {
        let status = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(500);
        let duration_ms = ctx.started.elapsed().as_secs_f64() * 1000.0;

        StampMetrics::global().record_request(ctx.outcome);

        match e {
            Some(error) => tracing::error!(
                method = %ctx.method,
                path = %ctx.path,
                status = status,
                outcome = ctx.outcome,
                duration_ms = duration_ms,
                error = %error,
                "Request failed"
            ),
            None => tracing::info!(
                method = %ctx.method,
                path = %ctx.path,
                status = status,
                outcome = ctx.outcome,
                duration_ms = duration_ms,
                "Request completed"
            ),
        }
    }
}
