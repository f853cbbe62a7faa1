//! TIFF header and IFD parsing.
//!
//! Reads classic TIFF structures from an in-memory buffer.
//!
//! # TIFF Header Structure
//!
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! # IFD Structure
//!
//! ```text
//! 2 bytes        entry count N
//! N × 12 bytes   entries: tag (2) | type (2) | count (4) | value or offset (4)
//! 4 bytes        offset of next IFD (0 = none)
//! ```

use std::collections::HashMap;

use crate::error::TiffError;

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of one classic IFD entry in bytes
pub const IFD_ENTRY_SIZE: usize = 12;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first two bytes of `bytes`.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first four bytes of `bytes`.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read an f64 from the first eight bytes of `bytes`.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => f64::from_le_bytes(raw),
            ByteOrder::BigEndian => f64::from_be_bytes(raw),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed classic TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header at the start of `bytes`.
    ///
    /// # Errors
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 (BigTIFF is never produced here)
    /// - `InvalidIfdOffset` if the first IFD offset is outside the buffer
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Checked as raw bytes; both orders repeat the same character
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        if version != VERSION_TIFF {
            return Err(TiffError::InvalidVersion(version));
        }

        let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
        if first_ifd_offset >= bytes.len() as u64 {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            first_ifd_offset,
        })
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// One 12-byte IFD entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    /// Raw tag ID
    pub tag: u16,

    /// Parsed field type, `None` if unknown
    pub field_type: Option<FieldType>,

    /// Raw field type value
    pub field_type_raw: u16,

    /// Number of values
    pub count: u32,

    /// The 4-byte value/offset field, as stored
    pub value_offset_bytes: [u8; 4],

    /// Absolute position of the value/offset field in the file
    pub value_field_position: usize,
}

impl IfdEntry {
    /// Total byte size of this entry's value, if the type is known.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .map(|ft| ft.size_in_bytes() as u64 * self.count as u64)
    }

    /// Whether the value lives inside the entry itself.
    pub fn is_inline(&self) -> bool {
        self.field_type
            .map(|ft| ft.fits_inline(self.count as u64))
            .unwrap_or(false)
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory bound to the buffer it came from.
#[derive(Debug, Clone)]
pub struct Ifd<'a> {
    data: &'a [u8],
    byte_order: ByteOrder,
    entries: HashMap<u16, IfdEntry>,

    /// Offset of the next IFD, 0 if this is the last one
    pub next_ifd_offset: u64,
}

impl<'a> Ifd<'a> {
    /// Parse the IFD at `offset` in `data`.
    pub fn parse(data: &'a [u8], offset: u64, byte_order: ByteOrder) -> Result<Self, TiffError> {
        let start = offset as usize;
        let count_bytes = slice(data, start, 2).ok_or(TiffError::InvalidIfdOffset(offset))?;
        let entry_count = byte_order.read_u16(count_bytes) as usize;

        let table_len = entry_count * IFD_ENTRY_SIZE;
        let table = slice(data, start + 2, table_len).ok_or(TiffError::FileTooSmall {
            required: (start + 2 + table_len + 4) as u64,
            actual: data.len() as u64,
        })?;

        let mut entries = HashMap::with_capacity(entry_count);
        for (i, raw) in table.chunks_exact(IFD_ENTRY_SIZE).enumerate() {
            let field_type_raw = byte_order.read_u16(&raw[2..4]);
            let entry = IfdEntry {
                tag: byte_order.read_u16(&raw[0..2]),
                field_type: FieldType::from_u16(field_type_raw),
                field_type_raw,
                count: byte_order.read_u32(&raw[4..8]),
                value_offset_bytes: [raw[8], raw[9], raw[10], raw[11]],
                value_field_position: start + 2 + i * IFD_ENTRY_SIZE + 8,
            };
            entries.insert(entry.tag, entry);
        }

        let next_ifd_offset = slice(data, start + 2 + table_len, 4)
            .map(|b| byte_order.read_u32(b) as u64)
            .unwrap_or(0);

        Ok(Self {
            data,
            byte_order,
            entries,
            next_ifd_offset,
        })
    }

    /// Number of entries in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by tag.
    pub fn entry(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries.get(&tag.as_u16())
    }

    /// Whether the tag is present.
    pub fn contains(&self, tag: TiffTag) -> bool {
        self.entries.contains_key(&tag.as_u16())
    }

    /// Raw bytes of an entry's value, inline or at its offset.
    pub fn value_bytes(&self, tag: TiffTag) -> Result<&'a [u8], TiffError> {
        let entry = self.entry(tag).ok_or(TiffError::MissingTag(tag.name()))?;
        let size = entry.value_byte_size().ok_or(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("unknown field type {}", entry.field_type_raw),
        })? as usize;

        if entry.is_inline() {
            return slice(self.data, entry.value_field_position, size)
                .ok_or(TiffError::MissingTag(tag.name()));
        }

        let offset = self.byte_order.read_u32(&entry.value_offset_bytes) as usize;
        slice(self.data, offset, size).ok_or(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("value at {} (+{}) is outside the file", offset, size),
        })
    }

    /// Read an array of unsigned integers (Byte, Short or Long).
    pub fn read_u32_array(&self, tag: TiffTag) -> Result<Vec<u32>, TiffError> {
        let entry = self.entry(tag).ok_or(TiffError::MissingTag(tag.name()))?;
        let bytes = self.value_bytes(tag)?;
        let order = self.byte_order;

        match entry.field_type {
            Some(FieldType::Byte) => Ok(bytes.iter().map(|&b| b as u32).collect()),
            Some(FieldType::Short) => Ok(bytes
                .chunks_exact(2)
                .map(|c| order.read_u16(c) as u32)
                .collect()),
            Some(FieldType::Long) => Ok(bytes.chunks_exact(4).map(|c| order.read_u32(c)).collect()),
            other => Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected Byte, Short or Long, got {:?}", other),
            }),
        }
    }

    /// Read a single unsigned integer.
    pub fn read_u32(&self, tag: TiffTag) -> Result<u32, TiffError> {
        self.read_u32_array(tag)?
            .first()
            .copied()
            .ok_or(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: "empty value".to_string(),
            })
    }

    /// Read an array of Short values.
    pub fn read_u16_array(&self, tag: TiffTag) -> Result<Vec<u16>, TiffError> {
        let entry = self.entry(tag).ok_or(TiffError::MissingTag(tag.name()))?;
        if entry.field_type != Some(FieldType::Short) {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected Short, got {:?}", entry.field_type),
            });
        }
        let order = self.byte_order;
        Ok(self
            .value_bytes(tag)?
            .chunks_exact(2)
            .map(|c| order.read_u16(c))
            .collect())
    }

    /// Read an array of Double values.
    pub fn read_f64_array(&self, tag: TiffTag) -> Result<Vec<f64>, TiffError> {
        let entry = self.entry(tag).ok_or(TiffError::MissingTag(tag.name()))?;
        if entry.field_type != Some(FieldType::Double) {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected Double, got {:?}", entry.field_type),
            });
        }
        let order = self.byte_order;
        Ok(self
            .value_bytes(tag)?
            .chunks_exact(8)
            .map(|c| order.read_f64(c))
            .collect())
    }
}

/// Bounds-checked subslice.
#[inline]
fn slice(data: &[u8], start: usize, len: usize) -> Option<&[u8]> {
    data.get(start..start.checked_add(len)?)
}

// =============================================================================
// Tests
// =============================================================================
