//! Reading transcoded rasters back.
//!
//! [`read_raster`] decodes the first image of an 8-bit, 4-sample TIFF into
//! band planes and recovers its GeoTIFF georeferencing. It accepts what the
//! encoder writes (planar, Deflate) and the common chunky/uncompressed
//! variants, which is enough to verify a transcode end to end.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::TiffError;
use crate::raster::{BandPlanes, CoordinateReference, GeoTransform, CHANNELS};

use super::parser::{Ifd, TiffHeader};
use super::tags::{geokey, Compression, TiffTag};

/// Planar configuration value for band-sequential storage.
pub const PLANAR_SEPARATE: u16 = 2;

/// Planar configuration value for interleaved storage.
pub const PLANAR_CHUNKY: u16 = 1;

/// A raster decoded from a TIFF container.
#[derive(Debug, Clone)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub compression: Compression,
    pub planar_configuration: u16,
    pub bands: BandPlanes,
    pub transform: Option<GeoTransform>,
    pub crs: Option<CoordinateReference>,
}

/// Decode a 4-band 8-bit TIFF.
pub fn read_raster(data: &[u8]) -> Result<DecodedRaster, TiffError> {
    let header = TiffHeader::parse(data)?;
    let ifd = Ifd::parse(data, header.first_ifd_offset, header.byte_order)?;

    let width = ifd.read_u32(TiffTag::ImageWidth)?;
    let height = ifd.read_u32(TiffTag::ImageLength)?;

    let samples = ifd.read_u32(TiffTag::SamplesPerPixel)?;
    if samples as usize != CHANNELS {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::SamplesPerPixel.name(),
            message: format!("expected {} samples, got {}", CHANNELS, samples),
        });
    }

    let bits = ifd.read_u32_array(TiffTag::BitsPerSample)?;
    if bits.iter().any(|&b| b != 8) {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::BitsPerSample.name(),
            message: format!("expected 8 bits per sample, got {:?}", bits),
        });
    }

    let compression_raw = if ifd.contains(TiffTag::Compression) {
        ifd.read_u32(TiffTag::Compression)? as u16
    } else {
        Compression::None.as_u16()
    };
    let compression = Compression::from_u16(compression_raw)
        .filter(|c| c.is_supported())
        .ok_or(TiffError::UnsupportedCompression(compression_raw))?;

    let planar_configuration = if ifd.contains(TiffTag::PlanarConfiguration) {
        ifd.read_u32(TiffTag::PlanarConfiguration)? as u16
    } else {
        PLANAR_CHUNKY
    };

    let offsets = ifd.read_u32_array(TiffTag::StripOffsets)?;
    let counts = ifd.read_u32_array(TiffTag::StripByteCounts)?;
    if offsets.len() != counts.len() {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::StripByteCounts.name(),
            message: format!("{} offsets but {} byte counts", offsets.len(), counts.len()),
        });
    }

    let mut strips = Vec::with_capacity(offsets.len());
    for (&offset, &count) in offsets.iter().zip(&counts) {
        let raw = data
            .get(offset as usize..offset as usize + count as usize)
            .ok_or(TiffError::FileTooSmall {
                required: offset as u64 + count as u64,
                actual: data.len() as u64,
            })?;
        strips.push(decompress(raw, compression)?);
    }

    let pixels = width as usize * height as usize;
    let bands = match planar_configuration {
        PLANAR_SEPARATE => split_planar(&strips, width, height)?,
        PLANAR_CHUNKY => {
            let chunky: Vec<u8> = strips.concat();
            if chunky.len() < pixels * CHANNELS {
                return Err(TiffError::CorruptStrip(format!(
                    "{} bytes of pixel data, expected {}",
                    chunky.len(),
                    pixels * CHANNELS
                )));
            }
            let mut planes = BandPlanes {
                width,
                height,
                red: Vec::with_capacity(pixels),
                green: Vec::with_capacity(pixels),
                blue: Vec::with_capacity(pixels),
                alpha: Vec::with_capacity(pixels),
            };
            for px in chunky[..pixels * CHANNELS].chunks_exact(CHANNELS) {
                planes.red.push(px[0]);
                planes.green.push(px[1]);
                planes.blue.push(px[2]);
                planes.alpha.push(px[3]);
            }
            planes
        }
        other => {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::PlanarConfiguration.name(),
                message: format!("unknown planar configuration {}", other),
            })
        }
    };

    Ok(DecodedRaster {
        width,
        height,
        compression,
        planar_configuration,
        bands,
        transform: read_transform(&ifd)?,
        crs: read_crs(&ifd)?,
    })
}

fn decompress(raw: &[u8], compression: Compression) -> Result<Vec<u8>, TiffError> {
    match compression {
        Compression::None => Ok(raw.to_vec()),
        Compression::Deflate | Compression::AdobeDeflate => {
            let mut out = Vec::new();
            ZlibDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| TiffError::CorruptStrip(e.to_string()))?;
            Ok(out)
        }
        other => Err(TiffError::UnsupportedCompression(other.as_u16())),
    }
}

/// Split band-sequential strips into planes.
///
/// Strips are ordered band by band; each band may span several strips.
fn split_planar(strips: &[Vec<u8>], width: u32, height: u32) -> Result<BandPlanes, TiffError> {
    let pixels = width as usize * height as usize;
    if strips.len() % CHANNELS != 0 {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::StripOffsets.name(),
            message: format!("{} strips cannot be split into {} bands", strips.len(), CHANNELS),
        });
    }

    let per_band = strips.len() / CHANNELS;
    let mut planes: Vec<Vec<u8>> = strips
        .chunks(per_band.max(1))
        .map(|band| band.concat())
        .collect();
    planes.resize(CHANNELS, Vec::new());

    for (i, plane) in planes.iter_mut().enumerate() {
        if plane.len() < pixels {
            return Err(TiffError::CorruptStrip(format!(
                "band {} has {} samples, expected {}",
                i + 1,
                plane.len(),
                pixels
            )));
        }
        plane.truncate(pixels);
    }

    let alpha = planes.pop().unwrap_or_default();
    let blue = planes.pop().unwrap_or_default();
    let green = planes.pop().unwrap_or_default();
    let red = planes.pop().unwrap_or_default();

    Ok(BandPlanes {
        width,
        height,
        red,
        green,
        blue,
        alpha,
    })
}

fn read_transform(ifd: &Ifd<'_>) -> Result<Option<GeoTransform>, TiffError> {
    if !ifd.contains(TiffTag::ModelPixelScale) || !ifd.contains(TiffTag::ModelTiepoint) {
        return Ok(None);
    }

    let scale = ifd.read_f64_array(TiffTag::ModelPixelScale)?;
    let tie = ifd.read_f64_array(TiffTag::ModelTiepoint)?;
    if scale.len() < 2 || tie.len() < 6 {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::ModelTiepoint.name(),
            message: "short pixel scale or tie point".to_string(),
        });
    }

    // Tie point (I, J) -> (X, Y); the origin is the model position of (0, 0)
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    Ok(Some(GeoTransform {
        origin_x: x - i * scale[0],
        pixel_width: scale[0],
        rotation_x: 0.0,
        origin_y: y + j * scale[1],
        rotation_y: 0.0,
        pixel_height: -scale[1],
    }))
}

fn read_crs(ifd: &Ifd<'_>) -> Result<Option<CoordinateReference>, TiffError> {
    if !ifd.contains(TiffTag::GeoKeyDirectory) {
        return Ok(None);
    }

    let keys = ifd.read_u16_array(TiffTag::GeoKeyDirectory)?;
    if keys.len() < 4 {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::GeoKeyDirectory.name(),
            message: "directory header is truncated".to_string(),
        });
    }

    // Header is [version, revision, minor, count]; then 4 shorts per key
    let count = keys[3] as usize;
    for key in keys[4..].chunks_exact(4).take(count) {
        let (id, location, value) = (key[0], key[1], key[3]);
        if location == 0 && (id == geokey::GEOGRAPHIC_TYPE || id == geokey::PROJECTED_CS_TYPE) {
            return Ok(Some(CoordinateReference::epsg(value)));
        }
    }

    Ok(None)
}
