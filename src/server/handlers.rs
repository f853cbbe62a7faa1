//! HTTP request handlers for the WMS front service.
//!
//! # Endpoints
//!
//! - `GET /wms?SERVICE=WMS&REQUEST=...` - Filtered WMS request
//! - `GET /?SERVICE=WMS&REQUEST=...` - Same, at the root
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::UpstreamError;
use crate::wms::{FilterFlow, Parameters, RequestContext, ResponseBuffer, ServerFilter};

use super::upstream::MapRenderer;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state: the upstream renderer and the filter that wraps it.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<R: MapRenderer> {
    /// Renderer that produces the base responses
    pub renderer: Arc<R>,

    /// Filter run around every WMS request
    pub filter: Arc<dyn ServerFilter>,
}

impl<R: MapRenderer> AppState<R> {
    pub fn new(renderer: R, filter: impl ServerFilter + 'static) -> Self {
        Self {
            renderer: Arc::new(renderer),
            filter: Arc::new(filter),
        }
    }
}

impl<R: MapRenderer> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            filter: Arc::clone(&self.filter),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "upstream_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Upstream failures are the only errors this service reports itself; the
/// renderer's own error documents pass through untouched.
impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            UpstreamError::Connection(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            UpstreamError::Timeout(_) => (StatusCode::BAD_GATEWAY, "upstream_timeout"),
            UpstreamError::InvalidUrl(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_misconfigured")
            }
        };
        let message = self.to_string();

        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle a WMS request.
///
/// # Endpoint
///
/// `GET /wms?...` or `GET /?...`
///
/// # Flow
///
/// 1. Request hook (may rewrite `FORMAT`)
/// 2. Upstream render with the rewritten parameters
/// 3. Response hook on a blocking thread (transcode / patch)
///
/// # Errors
///
/// - `502 Bad Gateway`: the renderer could not be reached
///
/// Upstream status codes and bodies are otherwise passed through.
pub async fn wms_handler<R: MapRenderer>(
    State(state): State<AppState<R>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, UpstreamError> {
    let mut ctx = RequestContext::new(Parameters::from_pairs(pairs));

    if state.filter.on_request_ready(&mut ctx) == FilterFlow::Stop {
        debug!("Request stopped by filter before rendering");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let rendered = state.renderer.render(&ctx.params).await?;

    let mut buffer = ResponseBuffer::new(rendered.status, rendered.body);
    if let Some(content_type) = rendered.content_type {
        buffer.set_header(http::header::CONTENT_TYPE.as_str(), content_type);
    }

    let buffer = run_response_hook(Arc::clone(&state.filter), ctx, buffer).await;
    Ok(into_http_response(buffer))
}

/// Run the response hook off the async runtime.
///
/// If the hook panics, the rendered response is sent as it was.
async fn run_response_hook(
    filter: Arc<dyn ServerFilter>,
    mut ctx: RequestContext,
    buffer: ResponseBuffer,
) -> ResponseBuffer {
    let original = buffer.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut buffer = buffer;
        filter.on_response_complete(&mut ctx, &mut buffer);
        buffer
    })
    .await;

    match result {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!("Response hook failed, sending unfiltered response: {}", e);
            original
        }
    }
}

fn into_http_response(buffer: ResponseBuffer) -> Response {
    let (status, headers, body): (StatusCode, Vec<(String, String)>, Bytes) = buffer.into_parts();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => debug!(header = %name, "Dropping invalid response header"),
        }
    }

    response
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
