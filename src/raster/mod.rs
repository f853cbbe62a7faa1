//! Raster transcoding.
//!
//! This module turns the renderer's PNG output into a GeoTIFF:
//!
//! - [`PixelGrid`] / [`BandPlanes`]: decoded RGBA pixels and their
//!   band-sequential form
//! - [`Georeference`]: affine transform and CRS derived from BBOX/CRS
//! - [`RasterEncoder`]: writes the TIFF through a virtual file

mod encoder;
mod georef;
mod pixels;

pub use encoder::{build_geokey_directory, RasterDataset, RasterDocument, RasterEncoder};
pub use georef::{
    BoundingBox, CoordinateReference, CrsKind, GeoTransform, Georeference, EPSG_PREFIX,
};
pub use pixels::{BandPlanes, PixelGrid, CHANNELS};
