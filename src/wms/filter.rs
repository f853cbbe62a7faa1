//! Server filters and the GeoTIFF output filter.
//!
//! A [`ServerFilter`] is called twice per request: once when the request is
//! ready to be rendered and once when the rendered response is complete.
//! Both hooks only mutate the request context or response they are handed.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//! request ──────► │ on_request_ready             │  FORMAT=image/tiff ─► image/png
//!                 └──────────────┬───────────────┘  (pending conversion marked)
//!                                ▼
//!                          map renderer
//!                                │
//!                 ┌──────────────▼───────────────┐
//! response ◄───── │ on_response_complete         │  GetMap + pending ─► GeoTIFF
//!                 └──────────────────────────────┘  GetCapabilities  ─► + <Format>
//! ```

use tracing::{debug, warn};

use crate::format::{PNG_MIME, TIFF_MIME, XML_MIME};
use crate::raster::RasterEncoder;

use super::capabilities::patch_capabilities;
use super::context::{RequestContext, ResponseBuffer};
use super::negotiate::negotiate_format;

/// What the host should do after a filter hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFlow {
    /// Keep processing the request.
    Continue,
    /// Stop processing and send the response as it is.
    Stop,
}

/// Hooks into the request/response pipeline.
///
/// One filter instance serves every request, possibly concurrently; any
/// per-request state must live in the [`RequestContext`].
pub trait ServerFilter: Send + Sync {
    /// Called before the request is rendered.
    fn on_request_ready(&self, _ctx: &mut RequestContext) -> FilterFlow {
        FilterFlow::Continue
    }

    /// Called once the response is complete, before it is sent.
    fn on_response_complete(
        &self,
        _ctx: &mut RequestContext,
        _response: &mut ResponseBuffer,
    ) -> FilterFlow {
        FilterFlow::Continue
    }
}

// =============================================================================
// GeoTiffFilter
// =============================================================================

/// Adds `image/tiff` output to a renderer that only produces PNG.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffFilter {
    encoder: RasterEncoder,
}

impl GeoTiffFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(encoder: RasterEncoder) -> Self {
        Self { encoder }
    }

    /// Replace a PNG body with the equivalent GeoTIFF.
    ///
    /// If the body cannot be decoded it is left alone. If encoding fails the
    /// PNG is kept and the content type is set to say so.
    fn transcode(&self, ctx: &RequestContext, response: &mut ResponseBuffer) {
        let bbox = ctx.param("BBOX");
        let crs = match ctx.param("CRS") {
            "" => ctx.param("SRS"),
            crs => crs,
        };

        match self.encoder.encode_png(response.body(), bbox, crs) {
            Ok(tiff) => {
                debug!(size = tiff.len(), "Transcoded GetMap response to GeoTIFF");
                response.replace_body(tiff);
                response.set_header(http::header::CONTENT_TYPE.as_str(), TIFF_MIME);
            }
            Err(e @ crate::error::RasterError::Decode { .. }) => {
                warn!(
                    status = response.status().as_u16(),
                    content_type = response.content_type().unwrap_or(""),
                    "Renderer response is not a PNG, not transcoding: {}",
                    e
                );
            }
            Err(e) => {
                warn!("GeoTIFF encoding failed, returning PNG: {}", e);
                response.set_header(http::header::CONTENT_TYPE.as_str(), PNG_MIME);
            }
        }
    }

    fn advertise(&self, response: &mut ResponseBuffer) {
        match patch_capabilities(response.body(), TIFF_MIME) {
            Ok(Some(patched)) => {
                response.replace_body(patched);
                response.set_header(http::header::CONTENT_TYPE.as_str(), XML_MIME);
            }
            Ok(None) => warn!("GetMap element not found, capabilities left unchanged"),
            Err(e) => warn!("Could not patch capabilities: {}", e),
        }
    }
}

impl ServerFilter for GeoTiffFilter {
    fn on_request_ready(&self, ctx: &mut RequestContext) -> FilterFlow {
        negotiate_format(ctx);
        FilterFlow::Continue
    }

    fn on_response_complete(
        &self,
        ctx: &mut RequestContext,
        response: &mut ResponseBuffer,
    ) -> FilterFlow {
        let convert = ctx.pending.take();

        if ctx.service() != "WMS" {
            return FilterFlow::Continue;
        }

        match ctx.operation().as_str() {
            "GETCAPABILITIES" | "GETPROJECTSETTINGS" => self.advertise(response),
            "GETMAP" if convert => self.transcode(ctx, response),
            _ => {}
        }

        FilterFlow::Continue
    }
}
