//! API integration tests for the WMS front service.
//!
//! Tests verify:
//! - GetMap for image/tiff is rendered as PNG upstream and returned as GeoTIFF
//! - Other requests pass through untouched
//! - Upstream failures map to JSON errors

use axum::http::StatusCode;
use tower::ServiceExt;

use wms_tiff::{create_router, read_raster, GeoTiffFilter, RouterConfig, TIFF_MIME};

use super::test_utils::{
    body_bytes, content_type, get, pattern_png, MockRenderer, UnreachableRenderer,
    SERVICE_EXCEPTION_XML,
};

fn router(renderer: MockRenderer) -> axum::Router {
    create_router(
        renderer,
        GeoTiffFilter::new(),
        RouterConfig::new().with_tracing(false),
    )
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let response = router(MockRenderer::new())
        .oneshot(get("/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// GetMap
// =============================================================================

#[tokio::test]
async fn test_get_map_tiff() {
    let renderer = MockRenderer::new();
    let requests = renderer.requests();

    let response = router(renderer)
        .oneshot(get(
            "/wms?SERVICE=wms&REQUEST=getmap&FORMAT=IMAGE/TIFF&WIDTH=32&HEIGHT=16&BBOX=0,0,20,10&CRS=EPSG:4326",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response).as_deref(), Some(TIFF_MIME));

    let body = body_bytes(response).await;
    let raster = read_raster(&body).unwrap();
    assert_eq!((raster.width, raster.height), (32, 16));

    // Upstream was asked for PNG
    let recorded = requests.read().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].get("format"), Some("image/png"));
    assert_eq!(recorded[0].get("BBOX"), Some("0,0,20,10"));
}

#[tokio::test]
async fn test_get_map_png_passthrough() {
    let response = router(MockRenderer::new())
        .oneshot(get(
            "/wms?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/png&WIDTH=8&HEIGHT=8",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response).as_deref(), Some("image/png"));
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), pattern_png(8, 8).as_slice());
}

#[tokio::test]
async fn test_get_map_unsupported_format_passthrough() {
    let renderer = MockRenderer::new();
    let requests = renderer.requests();

    let response = router(renderer)
        .oneshot(get("/wms?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/webp"))
        .await
        .unwrap();

    assert_eq!(content_type(&response).as_deref(), Some("text/xml"));
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), SERVICE_EXCEPTION_XML.as_bytes());
    assert_eq!(
        requests.read().await[0].get("FORMAT"),
        Some("image/webp")
    );
}

#[tokio::test]
async fn test_root_path_is_wms() {
    let response = router(MockRenderer::new())
        .oneshot(get(
            "/?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/tiff&WIDTH=4&HEIGHT=4",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response).as_deref(), Some(TIFF_MIME));
}

#[tokio::test]
async fn test_other_service_untouched() {
    let renderer = MockRenderer::new();
    let requests = renderer.requests();

    let response = router(renderer)
        .oneshot(get("/wms?SERVICE=WFS&REQUEST=GetMap&FORMAT=image/tiff"))
        .await
        .unwrap();

    // Not rewritten, so the PNG-only renderer refuses it
    assert_eq!(content_type(&response).as_deref(), Some("text/xml"));
    assert_eq!(requests.read().await[0].get("FORMAT"), Some("image/tiff"));
}

#[tokio::test]
async fn test_upstream_status_passthrough() {
    let response = router(MockRenderer::new())
        .oneshot(get("/wms?SERVICE=WMS&REQUEST=Unknown"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), SERVICE_EXCEPTION_XML.as_bytes());
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_upstream_unreachable() {
    let router = create_router(
        UnreachableRenderer,
        GeoTiffFilter::new(),
        RouterConfig::new().with_tracing(false),
    );

    let response = router
        .oneshot(get("/wms?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/tiff"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_bytes(response).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "upstream_unavailable");
    assert_eq!(json["status"], 502);
}
