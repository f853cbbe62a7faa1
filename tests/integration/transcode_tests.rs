//! Transcoding tests: pixel and georeference fidelity of the GeoTIFF output.

use std::sync::Arc;

use axum::http::StatusCode;
use tower::ServiceExt;

use wms_tiff::{
    create_router, read_raster, CoordinateReference, CrsKind, GeoTiffFilter, MemoryFs, PixelGrid,
    RasterEncoder, RouterConfig, TIFF_MIME,
};

use super::test_utils::{body_bytes, content_type, get, pattern_pixel, pattern_png, MockRenderer};

const TOLERANCE: f64 = 1e-9;

#[test]
fn test_roundtrip_preserves_every_pixel() {
    let png = pattern_png(37, 23);
    let encoder = RasterEncoder::with_fs(Arc::new(MemoryFs::new()));
    let tiff = encoder
        .encode_png(&png, "-180,-90,180,90", "EPSG:4326")
        .unwrap();

    let raster = read_raster(&tiff).unwrap();
    let grid = raster.bands.interleave().unwrap();
    assert_eq!(grid, PixelGrid::decode_png(&png).unwrap());

    for y in 0..23 {
        for x in 0..37 {
            assert_eq!(grid.pixel(x, y), Some(pattern_pixel(x, y)), "({}, {})", x, y);
        }
    }
}

#[test]
fn test_roundtrip_recovers_transform() {
    let encoder = RasterEncoder::with_fs(Arc::new(MemoryFs::new()));
    let tiff = encoder
        .encode_png(&pattern_png(100, 100), "0,0,10,10", "EPSG:4326")
        .unwrap();

    let transform = read_raster(&tiff).unwrap().transform.unwrap();
    assert!((transform.origin_x - 0.0).abs() < TOLERANCE);
    assert!((transform.origin_y - 10.0).abs() < TOLERANCE);
    assert!((transform.pixel_width - 0.1).abs() < TOLERANCE);
    assert!((transform.pixel_height + 0.1).abs() < TOLERANCE);
    assert_eq!(transform.rotation_x, 0.0);
    assert_eq!(transform.rotation_y, 0.0);
}

#[test]
fn test_projected_crs() {
    let encoder = RasterEncoder::with_fs(Arc::new(MemoryFs::new()));
    let tiff = encoder
        .encode_png(
            &pattern_png(8, 8),
            "-20037508.34,-20037508.34,20037508.34,20037508.34",
            "EPSG:3857",
        )
        .unwrap();

    let raster = read_raster(&tiff).unwrap();
    assert_eq!(raster.crs, Some(CoordinateReference::epsg(3857)));
    assert_eq!(raster.crs.unwrap().kind(), Some(CrsKind::Projected));
}

#[test]
fn test_malformed_bbox_encodes_without_georeference() {
    let encoder = RasterEncoder::with_fs(Arc::new(MemoryFs::new()));

    for bbox in ["abc", "1,2,3", "", "1,2,3,x"] {
        let tiff = encoder
            .encode_png(&pattern_png(5, 5), bbox, "EPSG:4326")
            .unwrap();
        let raster = read_raster(&tiff).unwrap();
        assert!(raster.transform.is_none(), "bbox {:?}", bbox);
        assert!(raster.crs.is_none(), "bbox {:?}", bbox);
    }
}

#[test]
fn test_unrecognised_crs_keeps_transform() {
    let encoder = RasterEncoder::with_fs(Arc::new(MemoryFs::new()));
    let tiff = encoder
        .encode_png(&pattern_png(5, 5), "0,0,1,1", "CRS:84")
        .unwrap();

    let raster = read_raster(&tiff).unwrap();
    assert!(raster.transform.is_some());
    assert!(raster.crs.is_none());
}

#[test]
fn test_virtual_files_released() {
    let fs = Arc::new(MemoryFs::new());
    let encoder = RasterEncoder::with_fs(Arc::clone(&fs));

    for _ in 0..5 {
        encoder
            .encode_png(&pattern_png(4, 4), "0,0,1,1", "EPSG:4326")
            .unwrap();
    }
    assert!(encoder.encode_png(b"garbage", "0,0,1,1", "").is_err());
    assert_eq!(fs.open_count(), 0);
}

#[tokio::test]
async fn test_concurrent_mixed_requests() {
    let router = create_router(
        MockRenderer::new(),
        GeoTiffFilter::new(),
        RouterConfig::new().with_tracing(false),
    );

    let uris = [
        "/wms?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/tiff&WIDTH=12&HEIGHT=12&BBOX=0,0,1,1",
        "/wms?SERVICE=WMS&REQUEST=GetCapabilities",
        "/wms?SERVICE=WMS&REQUEST=GetMap&FORMAT=image/png&WIDTH=12&HEIGHT=12",
    ];

    let mut handles = Vec::new();
    for i in 0..24 {
        let router = router.clone();
        let uri = uris[i % uris.len()];
        handles.push(tokio::spawn(async move {
            let response = router.oneshot(get(uri)).await.unwrap();
            (i % uris.len(), response)
        }));
    }

    for handle in handles {
        let (kind, response) = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let expected = match kind {
            0 => TIFF_MIME,
            1 => "text/xml",
            _ => "image/png",
        };
        assert_eq!(content_type(&response).as_deref(), Some(expected));

        let body = body_bytes(response).await;
        match kind {
            0 => assert!(read_raster(&body).is_ok()),
            1 => assert!(std::str::from_utf8(&body)
                .unwrap()
                .contains("<Format>image/tiff</Format>")),
            _ => assert_eq!(body.as_ref(), pattern_png(12, 12).as_slice()),
        }
    }
}
