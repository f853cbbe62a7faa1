//! TIFF container support.
//!
//! Transcoded maps are delivered as classic TIFF files with GeoTIFF tags.
//! This module holds the tag vocabulary shared with the encoder and a small
//! in-memory reader used to inspect and verify encoded rasters.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header.
//!
//! - **IFD (Image File Directory)**: Holds the image metadata and strip
//!   locations. A transcoded map has exactly one.
//!
//! - **GeoTIFF**: Georeferencing lives in three extra tags: pixel scale, tie
//!   point and a GeoKey directory naming the EPSG code.

mod parser;
mod reader;
mod tags;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, IFD_ENTRY_SIZE, TIFF_HEADER_SIZE};
pub use reader::{read_raster, DecodedRaster, PLANAR_CHUNKY, PLANAR_SEPARATE};
pub use tags::{geokey, Compression, FieldType, TiffTag};
