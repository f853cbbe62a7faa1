//! GeoTIFF raster encoder.
//!
//! Turns a rendered PNG into a 4-band GeoTIFF:
//!
//! ```text
//! PNG bytes ──► PixelGrid ──► BandPlanes (R, G, B, A)
//!                                  │
//!                 Georeference ────┤
//!                                  ▼
//!                RasterDataset on a VirtualFile (Deflate, planar)
//!                                  │ close()
//!                                  ▼
//!                        read_all() ──► TIFF bytes
//! ```
//!
//! # Design Decisions
//!
//! - **Planar storage**: each band is written as its own strip, so the planes
//!   produced by the deinterleaver go to the backend without re-interleaving.
//!
//! - **Lossless only**: strips are Deflate-compressed; every sample survives.
//!
//! - **Scoped sink**: the dataset writes into a [`VirtualFile`] that is
//!   released when encoding returns, whatever the outcome.

use std::io::{Seek, Write};
use std::sync::Arc;

use ::tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use ::tiff::tags::Tag;
use bytes::Bytes;
use flate2::write::ZlibEncoder;
use tracing::debug;

use crate::error::RasterError;
use crate::format::tiff::{geokey, Compression, TiffTag};
use crate::io::{MemoryFs, VirtualFile};

use super::georef::{CoordinateReference, CrsKind, GeoTransform, Georeference};
use super::pixels::{BandPlanes, PixelGrid, CHANNELS};

/// PhotometricInterpretation = RGB.
const PHOTOMETRIC_RGB: u16 = 2;

/// PlanarConfiguration = separate planes.
const PLANAR_SEPARATE: u16 = 2;

/// ExtraSamples = unassociated alpha.
const EXTRA_SAMPLE_UNASSOCIATED_ALPHA: u16 = 2;

/// SampleFormat = unsigned integer.
const SAMPLE_FORMAT_UINT: u16 = 1;

// =============================================================================
// RasterDocument
// =============================================================================

/// A 4-band, 8-bit raster ready to be serialized.
#[derive(Debug, Clone)]
pub struct RasterDocument {
    pub bands: BandPlanes,
    pub georeference: Georeference,
    pub compression: Compression,
}

impl RasterDocument {
    /// Build a document from a decoded grid.
    pub fn new(grid: &PixelGrid, georeference: Georeference) -> Self {
        Self {
            bands: grid.deinterleave(),
            georeference,
            compression: Compression::Deflate,
        }
    }

    pub fn width(&self) -> u32 {
        self.bands.width
    }

    pub fn height(&self) -> u32 {
        self.bands.height
    }
}

// =============================================================================
// RasterDataset
// =============================================================================

/// A raster dataset backed by a seekable writer.
///
/// Mirrors the create / set metadata / write bands / close sequence of a
/// file-oriented raster library. Nothing reaches the writer until
/// [`close`](RasterDataset::close).
pub struct RasterDataset<W: Write + Seek> {
    writer: W,
    width: u32,
    height: u32,
    compression: Compression,
    transform: Option<GeoTransform>,
    crs: Option<CoordinateReference>,
    bands: [Option<Vec<u8>>; CHANNELS],
}

impl<W: Write + Seek> RasterDataset<W> {
    /// Create a 4-band, 8-bit dataset of `width`×`height`.
    pub fn create(
        writer: W,
        width: u32,
        height: u32,
        compression: Compression,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Backend {
                message: format!("cannot create a {}x{} dataset", width, height),
            });
        }
        if !compression.is_lossless() || !compression.is_supported() {
            return Err(RasterError::Backend {
                message: format!("{} compression is not available", compression.name()),
            });
        }

        Ok(Self {
            writer,
            width,
            height,
            compression,
            transform: None,
            crs: None,
            bands: Default::default(),
        })
    }

    /// Attach a pixel → world transform.
    ///
    /// GeoTIFF pixel scale and tie point only describe north-up rasters, so
    /// rotated transforms are refused.
    pub fn set_geo_transform(&mut self, transform: GeoTransform) -> Result<(), RasterError> {
        if !transform.is_north_up() {
            return Err(RasterError::Backend {
                message: "rotated geotransforms are not supported".to_string(),
            });
        }
        self.transform = Some(transform);
        Ok(())
    }

    pub fn set_crs(&mut self, crs: CoordinateReference) {
        self.crs = Some(crs);
    }

    /// Write one band (0 = red .. 3 = alpha).
    pub fn write_band(&mut self, index: usize, samples: &[u8]) -> Result<(), RasterError> {
        let expected = self.width as usize * self.height as usize;
        if index >= CHANNELS || samples.len() != expected {
            return Err(RasterError::BandSize {
                band: index,
                expected,
                actual: samples.len(),
            });
        }

        let compressed = match self.compression {
            Compression::None => samples.to_vec(),
            _ => {
                let mut z = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                z.write_all(samples)?;
                z.finish()?
            }
        };
        self.bands[index] = Some(compressed);
        Ok(())
    }

    /// Serialize the dataset and hand back the writer.
    ///
    /// Bands that were never written are stored as zeros.
    pub fn close(self) -> Result<W, RasterError> {
        let RasterDataset {
            mut writer,
            width,
            height,
            compression,
            transform,
            crs,
            bands,
        } = self;

        {
            let mut encoder = TiffEncoder::new(&mut writer)?;
            let mut dir = encoder.new_directory()?;

            let mut offsets = [0u32; CHANNELS];
            let mut counts = [0u32; CHANNELS];
            for (i, band) in bands.iter().enumerate() {
                let strip = match band {
                    Some(data) => data.clone(),
                    None => empty_strip(width, height, compression)?,
                };
                let offset = dir.write_data(strip.as_slice())?;
                offsets[i] = to_u32(offset)?;
                counts[i] = to_u32(strip.len() as u64)?;
            }

            dir.write_tag(Tag::ImageWidth, width)?;
            dir.write_tag(Tag::ImageLength, height)?;
            dir.write_tag(Tag::BitsPerSample, &[8u16; CHANNELS][..])?;
            dir.write_tag(Tag::Compression, compression.as_u16())?;
            dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_RGB)?;
            dir.write_tag(Tag::StripOffsets, &offsets[..])?;
            dir.write_tag(Tag::SamplesPerPixel, CHANNELS as u16)?;
            dir.write_tag(Tag::RowsPerStrip, height)?;
            dir.write_tag(Tag::StripByteCounts, &counts[..])?;
            dir.write_tag(Tag::PlanarConfiguration, PLANAR_SEPARATE)?;
            dir.write_tag(Tag::ExtraSamples, EXTRA_SAMPLE_UNASSOCIATED_ALPHA)?;
            dir.write_tag(Tag::SampleFormat, &[SAMPLE_FORMAT_UINT; CHANNELS][..])?;

            if let Some(transform) = transform {
                write_geotiff_tags(&mut dir, &transform, crs.as_ref())?;
            }

            dir.finish()?;
        }

        writer.flush()?;
        Ok(writer)
    }
}

fn empty_strip(width: u32, height: u32, compression: Compression) -> Result<Vec<u8>, RasterError> {
    let zeros = vec![0u8; width as usize * height as usize];
    match compression {
        Compression::None => Ok(zeros),
        _ => {
            let mut z = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            z.write_all(&zeros)?;
            Ok(z.finish()?)
        }
    }
}

fn to_u32(value: u64) -> Result<u32, RasterError> {
    u32::try_from(value).map_err(|_| RasterError::Backend {
        message: format!("offset {} exceeds classic TIFF limits", value),
    })
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CoordinateReference>,
) -> Result<(), RasterError> {
    // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]; Y is positive, north-up
    let pixel_scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    dir.write_tag(
        Tag::Unknown(TiffTag::ModelPixelScale.as_u16()),
        &pixel_scale[..],
    )?;

    // ModelTiepoint: raster (0, 0) sits at the transform origin
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(TiffTag::ModelTiepoint.as_u16()), &tiepoint[..])?;

    let keys = build_geokey_directory(crs);
    dir.write_tag(
        Tag::Unknown(TiffTag::GeoKeyDirectory.as_u16()),
        keys.as_slice(),
    )?;

    Ok(())
}

/// Build the GeoKeyDirectory.
///
/// ```text
/// [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
///  KeyID, TIFFTagLocation, Count, Value, ...]
/// ```
///
/// Keys must be sorted by ID. A CRS whose kind cannot be looked up gets no
/// model or CRS keys.
pub fn build_geokey_directory(crs: Option<&CoordinateReference>) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::with_capacity(3);

    // (model type, CRS key, EPSG code)
    let crs_keys = crs.and_then(|crs| {
        crs.kind().map(|kind| match kind {
            CrsKind::Geographic => (
                geokey::MODEL_TYPE_GEOGRAPHIC,
                geokey::GEOGRAPHIC_TYPE,
                crs.code(),
            ),
            CrsKind::Projected => (
                geokey::MODEL_TYPE_PROJECTED,
                geokey::PROJECTED_CS_TYPE,
                crs.code(),
            ),
        })
    });

    if let Some((model, _, _)) = crs_keys {
        keys.push([geokey::GT_MODEL_TYPE, 0, 1, model]);
    }

    keys.push([geokey::GT_RASTER_TYPE, 0, 1, geokey::RASTER_PIXEL_IS_AREA]);

    if let Some((_, id, code)) = crs_keys {
        keys.push([id, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    for key in keys {
        directory.extend_from_slice(&key);
    }
    directory
}

// =============================================================================
// RasterEncoder
// =============================================================================

/// Encodes rendered maps into GeoTIFF through a virtual file system.
#[derive(Debug, Clone)]
pub struct RasterEncoder {
    fs: Arc<MemoryFs>,
}

impl Default for RasterEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterEncoder {
    /// Create an encoder on the process-wide virtual file system.
    pub fn new() -> Self {
        Self {
            fs: MemoryFs::global(),
        }
    }

    /// Create an encoder on a specific virtual file system.
    pub fn with_fs(fs: Arc<MemoryFs>) -> Self {
        Self { fs }
    }

    /// The virtual file system used for scratch files.
    pub fn fs(&self) -> &Arc<MemoryFs> {
        &self.fs
    }

    /// Decode a PNG and encode it as GeoTIFF.
    ///
    /// Georeferencing is derived from `bbox` and `crs` at the decoded image's
    /// size; malformed values just leave it out.
    pub fn encode_png(&self, png: &[u8], bbox: &str, crs: &str) -> Result<Bytes, RasterError> {
        let grid = PixelGrid::decode_png(png)?;
        let georeference = Georeference::from_request(bbox, crs, grid.width(), grid.height());

        if georeference.transform.is_none() {
            debug!(bbox = bbox, "No usable BBOX, writing raster without georeferencing");
        } else if georeference.crs.and_then(|c| c.kind()).is_none() {
            debug!(crs = crs, "Unrecognised CRS, writing raster without a reference system");
        }

        self.encode(&RasterDocument::new(&grid, georeference))
    }

    /// Serialize a raster document.
    pub fn encode(&self, document: &RasterDocument) -> Result<Bytes, RasterError> {
        let file = self.fs.allocate("wms", "tif")?;
        write_document(&file, document)?;

        let bytes = file.read_all()?;
        debug!(
            path = file.path(),
            size = bytes.len(),
            width = document.width(),
            height = document.height(),
            "Encoded GeoTIFF"
        );
        Ok(bytes)
    }
}

fn write_document(file: &VirtualFile<'_>, document: &RasterDocument) -> Result<(), RasterError> {
    let mut dataset = RasterDataset::create(
        file.open_write(),
        document.width(),
        document.height(),
        document.compression,
    )?;

    if let Some(transform) = document.georeference.transform {
        dataset.set_geo_transform(transform)?;
        if let Some(crs) = document.georeference.crs {
            dataset.set_crs(crs);
        }
    }

    for (i, band) in document.bands.bands().into_iter().enumerate() {
        dataset.write_band(i, band)?;
    }

    dataset.close()?.close()?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
