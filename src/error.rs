use thiserror::Error;

/// Errors from the in-memory byte sink backing the raster encoder
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// No region is registered under the given path
    #[error("Virtual file not found: {0}")]
    NotFound(String),

    /// A region with this path is already open
    #[error("Virtual file already exists: {0}")]
    AlreadyExists(String),

    /// The region lock was poisoned by a panicking writer
    #[error("Virtual file system poisoned")]
    Poisoned,
}

/// Errors that can occur while transcoding a rendered map into a raster container
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// The source image could not be decoded
    #[error("Failed to decode source image: {message}")]
    Decode { message: String },

    /// The raster backend could not create or write the dataset
    #[error("Raster backend error: {message}")]
    Backend { message: String },

    /// The byte sink failed
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// A band plane does not match the dataset dimensions
    #[error("Band {band} has {actual} samples, expected {expected}")]
    BandSize {
        band: usize,
        expected: usize,
        actual: usize,
    },

    /// A container could not be read back
    #[error("Invalid raster container: {0}")]
    Container(#[from] TiffError),
}

impl From<tiff::TiffError> for RasterError {
    fn from(e: tiff::TiffError) -> Self {
        RasterError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for RasterError {
    fn from(e: std::io::Error) -> Self {
        RasterError::Backend {
            message: e.to_string(),
        }
    }
}

/// Errors that can occur when reading back a TIFF container
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42, got {0}")]
    InvalidVersion(u16),

    /// Buffer is too small for the structure being read
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside the buffer)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(u16),

    /// Strip data could not be inflated
    #[error("Corrupt strip data: {0}")]
    CorruptStrip(String),
}

/// Errors from the capabilities patcher
#[derive(Debug, Clone, Error)]
pub enum CapabilitiesError {
    /// Body is not valid UTF-8
    #[error("Capabilities document is not UTF-8: {0}")]
    Encoding(String),

    /// XML could not be read or written
    #[error("XML error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for CapabilitiesError {
    fn from(e: quick_xml::Error) -> Self {
        CapabilitiesError::Xml(e.to_string())
    }
}

impl From<std::io::Error> for CapabilitiesError {
    fn from(e: std::io::Error) -> Self {
        CapabilitiesError::Xml(e.to_string())
    }
}

/// Errors from the upstream map renderer
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Upstream did not answer in time
    #[error("Upstream timed out after {0} seconds")]
    Timeout(u64),

    /// Upstream URL could not be built
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}
