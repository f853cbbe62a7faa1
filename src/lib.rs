//! # WMS GeoTIFF
//!
//! Adds georeferenced TIFF output to a WMS whose renderer only produces PNG.
//!
//! A `GetMap` for `image/tiff` is rewritten to ask the renderer for
//! `image/png`; the rendered PNG is then transcoded into a 4-band GeoTIFF
//! carrying the request's extent and CRS. Capabilities documents are patched
//! to advertise `image/tiff`, so clients can discover it.
//!
//! ## Features
//!
//! - **Per-request state**: the pending-conversion flag travels with each
//!   request, never on the shared filter
//! - **Lossless output**: RGBA bands stored separately, Deflate-compressed
//! - **Graceful degradation**: a bad BBOX or CRS only drops georeferencing;
//!   encoding failures fall back to the rendered PNG
//! - **Scoped scratch space**: encoding goes through an in-memory virtual
//!   file that is always released
//!
//! ## Architecture
//!
//! - [`wms`] - Parameters, request context, format negotiation, capabilities
//!   patching and the [`GeoTiffFilter`]
//! - [`raster`] - PNG decoding, band deinterleaving, georeferencing and the
//!   GeoTIFF encoder
//! - [`io`] - In-memory virtual file system
//! - [`mod@format`] - TIFF tags and a reader for encoded rasters
//! - [`server`] - Axum-based front service and upstream renderer client
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wms_tiff::{GeoTiffFilter, Parameters, RequestContext, ResponseBuffer, ServerFilter};
//!
//! let filter = GeoTiffFilter::new();
//! let mut ctx = RequestContext::new(Parameters::from_pairs([
//!     ("SERVICE", "WMS"),
//!     ("REQUEST", "GetMap"),
//!     ("FORMAT", "image/tiff"),
//!     ("BBOX", "0,0,10,10"),
//!     ("CRS", "EPSG:4326"),
//! ]));
//!
//! filter.on_request_ready(&mut ctx);
//! assert_eq!(ctx.params.get("FORMAT"), Some("image/png"));
//!
//! # let png: Vec<u8> = Vec::new();
//! let mut response = ResponseBuffer::with_content_type(http::StatusCode::OK, "image/png", png);
//! filter.on_response_complete(&mut ctx, &mut response);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod raster;
pub mod server;
pub mod wms;

// Re-export commonly used types
pub use config::{Cli, Command, ConvertConfig, InspectConfig, ServeConfig};
pub use error::{CapabilitiesError, RasterError, SinkError, TiffError, UpstreamError};
pub use format::tiff::{read_raster, DecodedRaster};
pub use format::{PNG_MIME, TIFF_MIME, XML_MIME};
pub use io::{MemoryFs, SinkWriter, VirtualFile};
pub use raster::{
    BandPlanes, BoundingBox, CoordinateReference, CrsKind, GeoTransform, Georeference, PixelGrid,
    RasterDocument, RasterEncoder,
};
pub use server::{
    create_router, health_handler, wms_handler, AppState, ErrorResponse, HealthResponse,
    HttpMapRenderer, MapRenderer, RenderedMap, RouterConfig,
};
pub use wms::{
    negotiate_format, patch_capabilities, FilterFlow, GeoTiffFilter, Parameters,
    PendingConversion, RequestContext, ResponseBuffer, ServerFilter,
};
