//! Capabilities patching through the service.

use tower::ServiceExt;

use wms_tiff::{create_router, GeoTiffFilter, RouterConfig};

use super::test_utils::{body_bytes, content_type, get, MockRenderer};

async fn fetch(uri: &str) -> (Option<String>, String) {
    let router = create_router(
        MockRenderer::new(),
        GeoTiffFilter::new(),
        RouterConfig::new().with_tracing(false),
    );
    let response = router.oneshot(get(uri)).await.unwrap();
    let content_type = content_type(&response);
    let body = body_bytes(response).await;
    (content_type, String::from_utf8(body.to_vec()).unwrap())
}

/// Text of the `Format` entries between `<GetMap>` and `</GetMap>`.
fn get_map_formats(xml: &str) -> Vec<String> {
    let start = xml.find("<GetMap>").unwrap();
    let end = xml.find("</GetMap>").unwrap();
    xml[start..end]
        .split("<Format>")
        .skip(1)
        .filter_map(|s| s.split("</Format>").next())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_get_capabilities_advertises_tiff_first() {
    let (content_type, body) = fetch("/wms?SERVICE=WMS&REQUEST=GetCapabilities").await;

    assert_eq!(content_type.as_deref(), Some("text/xml"));
    assert_eq!(
        get_map_formats(&body),
        vec!["image/tiff", "image/png", "image/jpeg"]
    );
}

#[tokio::test]
async fn test_get_project_settings_patched() {
    let (_, body) = fetch("/wms?service=wms&request=getprojectsettings").await;
    assert_eq!(get_map_formats(&body)[0], "image/tiff");
}

#[tokio::test]
async fn test_declaration_is_canonical() {
    let (_, body) = fetch("/wms?SERVICE=WMS&REQUEST=GetCapabilities").await;

    let first_line = body.lines().next().unwrap();
    assert_eq!(first_line, r#"<?xml version="1.0" encoding="utf-8"?>"#);
    assert_eq!(body.matches("<?xml").count(), 1);
}

#[tokio::test]
async fn test_other_operations_unchanged() {
    let (_, body) = fetch("/wms?SERVICE=WMS&REQUEST=GetCapabilities").await;
    assert!(body.contains("<Format>text/xml</Format>"));
    assert_eq!(body.matches("image/tiff").count(), 1);
}

#[tokio::test]
async fn test_non_wms_capabilities_unchanged() {
    let (_, body) = fetch("/wms?SERVICE=WCS&REQUEST=GetCapabilities").await;
    assert!(!body.contains("image/tiff"));
}
