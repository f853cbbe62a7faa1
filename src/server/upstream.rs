//! Upstream map renderer.
//!
//! The service does not render maps itself. Each request, after the filter's
//! request hook has run, is forwarded to a renderer behind a [`MapRenderer`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::error::UpstreamError;
use crate::wms::Parameters;

/// A response from the renderer.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Something that renders WMS requests.
#[async_trait]
pub trait MapRenderer: Send + Sync + 'static {
    /// Render a request.
    ///
    /// Non-2xx answers are returned as a [`RenderedMap`]; only failures to
    /// get an answer at all are errors.
    async fn render(&self, params: &Parameters) -> Result<RenderedMap, UpstreamError>;
}

// =============================================================================
// HttpMapRenderer
// =============================================================================

/// Forwards requests to a WMS endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMapRenderer {
    client: reqwest::Client,
    base_url: reqwest::Url,
    timeout_secs: u64,
}

impl HttpMapRenderer {
    /// Create a renderer for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, UpstreamError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

#[async_trait]
impl MapRenderer for HttpMapRenderer {
    async fn render(&self, params: &Parameters) -> Result<RenderedMap, UpstreamError> {
        let query: Vec<(&str, &str)> = params.iter().collect();

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        debug!(
            status = status.as_u16(),
            size = body.len(),
            content_type = content_type.as_deref().unwrap_or(""),
            "Upstream response"
        );

        Ok(RenderedMap {
            status,
            content_type,
            body,
        })
    }
}

impl HttpMapRenderer {
    fn map_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else if e.is_builder() {
            UpstreamError::InvalidUrl(e.to_string())
        } else {
            UpstreamError::Connection(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpMapRenderer::new("not a url", 5),
            Err(UpstreamError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_base_url_kept() {
        let renderer = HttpMapRenderer::new("http://localhost:8080/ows", 5).unwrap();
        assert_eq!(renderer.base_url(), "http://localhost:8080/ows");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Port 9 (discard) is not expected to have an HTTP server
        let renderer = HttpMapRenderer::new("http://127.0.0.1:9/wms", 2).unwrap();
        let result = renderer
            .render(&Parameters::from_pairs([("SERVICE", "WMS")]))
            .await;
        assert!(matches!(
            result,
            Err(UpstreamError::Connection(_)) | Err(UpstreamError::Timeout(_))
        ));
    }
}
