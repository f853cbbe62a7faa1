//! Test utilities: a PNG-only mock renderer and request helpers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tokio::sync::RwLock;

use wms_tiff::{MapRenderer, Parameters, RenderedMap, UpstreamError};

// =============================================================================
// Test images
// =============================================================================

/// RGBA value of the test pattern at `(x, y)`.
pub fn pattern_pixel(x: u32, y: u32) -> [u8; 4] {
    [
        (x * 7) as u8,
        (y * 13) as u8,
        (x ^ y) as u8,
        if (x + y) % 3 == 0 { 0 } else { 255 },
    ]
}

/// Encode the test pattern as a PNG.
pub fn pattern_png(width: u32, height: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            rgba.extend_from_slice(&pattern_pixel(x, y));
        }
    }

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
        .expect("encode test PNG");
    out
}

pub const CAPABILITIES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Service>
    <Name>WMS</Name>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>text/xml</Format>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
      </GetMap>
    </Request>
  </Capability>
</WMS_Capabilities>"#;

pub const SERVICE_EXCEPTION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0">
  <ServiceException code="InvalidFormat">Output format not supported</ServiceException>
</ServiceExceptionReport>"#;

// =============================================================================
// Mock renderer
// =============================================================================

/// A renderer that only produces PNG, like the one the filter sits in front of.
///
/// Records the parameters of every request it receives.
#[derive(Clone, Default)]
pub struct MockRenderer {
    requests: Arc<RwLock<Vec<Parameters>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for reading recorded requests after the renderer is moved.
    pub fn requests(&self) -> Arc<RwLock<Vec<Parameters>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl MapRenderer for MockRenderer {
    async fn render(&self, params: &Parameters) -> Result<RenderedMap, UpstreamError> {
        self.requests.write().await.push(params.clone());

        let request = params.get_or_empty("REQUEST").to_ascii_uppercase();
        let rendered = match request.as_str() {
            "GETCAPABILITIES" | "GETPROJECTSETTINGS" => xml(StatusCode::OK, CAPABILITIES_XML),
            "GETMAP" if params.get_or_empty("FORMAT").eq_ignore_ascii_case("image/png") => {
                let width = params.get_or_empty("WIDTH").parse().unwrap_or(16);
                let height = params.get_or_empty("HEIGHT").parse().unwrap_or(16);
                RenderedMap {
                    status: StatusCode::OK,
                    content_type: Some("image/png".to_string()),
                    body: Bytes::from(pattern_png(width, height)),
                }
            }
            "GETMAP" => xml(StatusCode::OK, SERVICE_EXCEPTION_XML),
            _ => xml(StatusCode::BAD_REQUEST, SERVICE_EXCEPTION_XML),
        };
        Ok(rendered)
    }
}

fn xml(status: StatusCode, body: &'static str) -> RenderedMap {
    RenderedMap {
        status,
        content_type: Some("text/xml".to_string()),
        body: Bytes::from_static(body.as_bytes()),
    }
}

/// A renderer that cannot be reached.
#[derive(Clone, Default)]
pub struct UnreachableRenderer;

#[async_trait]
impl MapRenderer for UnreachableRenderer {
    async fn render(&self, _params: &Parameters) -> Result<RenderedMap, UpstreamError> {
        Err(UpstreamError::Connection("connection refused".to_string()))
    }
}

// =============================================================================
// Request helpers
// =============================================================================

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
}

pub fn content_type(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
