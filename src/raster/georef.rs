//! Georeferencing from WMS request parameters.
//!
//! A GetMap request describes its extent with `BBOX=minx,miny,maxx,maxy` and
//! its reference system with `CRS` (WMS 1.3) or `SRS` (WMS 1.1). Together with
//! the output size they give an affine pixel → world transform.
//!
//! Bad input never fails the transcode: an unparseable bounding box yields no
//! transform and an unrecognised CRS yields no reference system.

use std::fmt;

/// Authority prefix recognised on CRS identifiers.
pub const EPSG_PREFIX: &str = "EPSG:";

// =============================================================================
// GeoTransform
// =============================================================================

/// Affine coefficients mapping pixel (col, row) to world (x, y).
///
/// ```text
/// x = origin_x + col * pixel_width  + row * rotation_x
/// y = origin_y + col * rotation_y   + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up rasters whose first row is the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub origin_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform for a north-up raster of `width`×`height` pixels covering `bbox`.
    pub fn from_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        let pixel_width = bbox.width() / width as f64;
        let pixel_height = bbox.height() / height as f64;
        Self {
            origin_x: bbox.min_x,
            pixel_width,
            rotation_x: 0.0,
            origin_y: bbox.max_y,
            rotation_y: 0.0,
            pixel_height: -pixel_height,
        }
    }

    /// Coefficients in the conventional six-element order.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Whether the transform has no rotation terms.
    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }
}

// =============================================================================
// BoundingBox
// =============================================================================

/// A rectangular extent in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Parse a `minx,miny,maxx,maxy` string.
    ///
    /// Returns `None` unless there are exactly four comma-separated numbers.
    pub fn parse(s: &str) -> Option<Self> {
        let mut values = [0.0f64; 4];
        let mut count = 0;

        for token in s.split(',') {
            if count == 4 {
                return None;
            }
            values[count] = token.trim().parse().ok()?;
            count += 1;
        }

        if count != 4 {
            return None;
        }

        Some(Self {
            min_x: values[0],
            min_y: values[1],
            max_x: values[2],
            max_y: values[3],
        })
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

// =============================================================================
// CoordinateReference
// =============================================================================

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateReference {
    code: u16,
}

impl CoordinateReference {
    /// Parse an `EPSG:<code>` identifier.
    ///
    /// Only the `EPSG:` authority is recognised (case-insensitively). The
    /// code must be a decimal number that fits a GeoTIFF key value.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let prefix = s.get(..EPSG_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(EPSG_PREFIX) {
            return None;
        }
        let code = s[EPSG_PREFIX.len()..].trim().parse().ok()?;
        Some(Self { code })
    }

    /// Create from a bare EPSG code.
    pub const fn epsg(code: u16) -> Self {
        Self { code }
    }

    /// The EPSG code.
    #[inline]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Classify the system from its EPSG definition.
    ///
    /// `None` when the code is not in the registry, or names something a
    /// GeoTIFF model type cannot describe (geocentric, vertical).
    pub fn kind(&self) -> Option<CrsKind> {
        let def = crs_definitions::from_code(self.code)?;
        let proj = def
            .proj4
            .split_whitespace()
            .find_map(|param| param.strip_prefix("+proj="))?;

        match proj {
            "longlat" | "latlong" | "lonlat" | "latlon" => Some(CrsKind::Geographic),
            "geocent" => None,
            _ => Some(CrsKind::Projected),
        }
    }
}

/// The two families of reference system a GeoTIFF model type distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Geographic,
    Projected,
}

impl fmt::Display for CoordinateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", EPSG_PREFIX, self.code)
    }
}

// =============================================================================
// Georeference
// =============================================================================

/// Everything the encoder attaches to a raster to place it on the map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Georeference {
    pub transform: Option<GeoTransform>,
    pub crs: Option<CoordinateReference>,
}

impl Georeference {
    /// Derive georeferencing from request parameters and the output size.
    ///
    /// A CRS is only attached alongside a transform; without an extent there
    /// is nothing for it to describe.
    pub fn from_request(bbox: &str, crs: &str, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::default();
        }

        let transform = match BoundingBox::parse(bbox) {
            Some(bbox) => GeoTransform::from_bbox(&bbox, width, height),
            None => return Self::default(),
        };

        Self {
            transform: Some(transform),
            crs: CoordinateReference::parse(crs),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
