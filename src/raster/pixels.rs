//! Pixel grids and band planes.
//!
//! The renderer hands back a PNG. [`PixelGrid::decode_png`] turns it into an
//! RGBA grid, and [`PixelGrid::deinterleave`] splits that grid into the four
//! planes the raster dataset stores.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::RasterError;

/// Number of channels in a pixel grid.
pub const CHANNELS: usize = 4;

// =============================================================================
// PixelGrid
// =============================================================================

/// A decoded W×H RGBA image with 8 bits per channel.
///
/// Pixels are stored interleaved (`RGBARGBA...`), row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelGrid {
    /// Wrap an interleaved RGBA buffer.
    ///
    /// Fails if `data` is not exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(RasterError::Decode {
                message: format!(
                    "RGBA buffer has {} bytes, expected {} for {}x{}",
                    data.len(),
                    expected,
                    width,
                    height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode a PNG byte stream into an RGBA grid.
    ///
    /// Any PNG color type is accepted; gray, RGB and palette images are
    /// expanded to RGBA with an opaque alpha channel.
    pub fn decode_png(source: &[u8]) -> Result<Self, RasterError> {
        let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Png);

        let img = reader.decode().map_err(|e| RasterError::Decode {
            message: e.to_string(),
        })?;

        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (W×H).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The `[r, g, b, a]` value at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Raw interleaved bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Split the grid into four planes, one per channel.
    ///
    /// Works one scan line at a time so the inner loop is a tight walk over
    /// a contiguous row with no per-pixel bounds lookups.
    pub fn deinterleave(&self) -> BandPlanes {
        let n = self.pixel_count();
        let mut planes = BandPlanes {
            width: self.width,
            height: self.height,
            red: vec![0; n],
            green: vec![0; n],
            blue: vec![0; n],
            alpha: vec![0; n],
        };

        let w = self.width as usize;
        if w == 0 {
            return planes;
        }

        let rows = self.data.chunks_exact(w * CHANNELS);
        let red = planes.red.chunks_exact_mut(w);
        let green = planes.green.chunks_exact_mut(w);
        let blue = planes.blue.chunks_exact_mut(w);
        let alpha = planes.alpha.chunks_exact_mut(w);

        for ((((row, r), g), b), a) in rows.zip(red).zip(green).zip(blue).zip(alpha) {
            for (i, px) in row.chunks_exact(CHANNELS).enumerate() {
                r[i] = px[0];
                g[i] = px[1];
                b[i] = px[2];
                a[i] = px[3];
            }
        }

        planes
    }
}

// =============================================================================
// BandPlanes
// =============================================================================

/// Four single-channel planes of W×H samples each, in the grid's scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPlanes {
    pub width: u32,
    pub height: u32,
    pub red: Vec<u8>,
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
    pub alpha: Vec<u8>,
}

impl BandPlanes {
    /// Planes in dataset band order: R, G, B, A.
    pub fn bands(&self) -> [&[u8]; CHANNELS] {
        [&self.red, &self.green, &self.blue, &self.alpha]
    }

    /// Re-interleave into a grid.
    pub fn interleave(&self) -> Result<PixelGrid, RasterError> {
        let n = self.width as usize * self.height as usize;
        let mut data = Vec::with_capacity(n * CHANNELS);
        for i in 0..n {
            data.extend_from_slice(&[self.red[i], self.green[i], self.blue[i], self.alpha[i]]);
        }
        PixelGrid::from_rgba(self.width, self.height, data)
    }
}

// =============================================================================
// Tests
// =============================================================================
