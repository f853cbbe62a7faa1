//! Output container formats.
//!
//! The renderer only produces PNG; the TIFF container is what this service
//! adds on top.

pub mod tiff;

/// MIME type clients request to receive a GeoTIFF.
pub const TIFF_MIME: &str = "image/tiff";

/// MIME type the renderer natively produces.
pub const PNG_MIME: &str = "image/png";

/// MIME type of capability documents.
pub const XML_MIME: &str = "text/xml";
