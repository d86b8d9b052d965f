//! TIFF header parsing and format detection.
//!
//! The first four bytes of every TIFF file identify its byte order and its
//! variant. Only classic TIFF directories are walked by this crate; BigTIFF
//! is recognised so it can be rejected before any directory is touched.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43 = 0x002B)
//! ```

use crate::error::TiffError;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Bytes needed to identify byte order and version
const FORMAT_MARKER_SIZE: usize = 4;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read respecting this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(bytes),
            ByteOrder::BigEndian => u64::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_f64(self, bytes: [u8; 8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }
}

// =============================================================================
// TiffFormat / TiffHeader
// =============================================================================

/// TIFF variant declared by the version marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffFormat {
    /// Classic TIFF with 32-bit offsets and 12-byte IFD entries
    Classic,
    /// BigTIFF with 64-bit offsets (unsupported)
    BigTiff,
}

impl TiffFormat {
    pub const fn name(self) -> &'static str {
        match self {
            TiffFormat::Classic => "classic",
            TiffFormat::BigTiff => "bigtiff",
        }
    }
}

/// Byte order and variant read from the start of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Classic TIFF or BigTIFF
    pub format: TiffFormat,
}

impl TiffHeader {
    /// Parse the byte-order and version markers from raw bytes.
    ///
    /// # Errors
    /// - `Truncated` if fewer than 4 bytes are available
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < FORMAT_MARKER_SIZE {
            return Err(TiffError::Truncated {
                offset: 0,
                len: FORMAT_MARKER_SIZE as u64,
                size: bytes.len(),
            });
        }

        // Checked against fixed byte patterns, so the order of this read does not matter
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let format = match byte_order.read_u16([bytes[2], bytes[3]]) {
            VERSION_TIFF => TiffFormat::Classic,
            VERSION_BIGTIFF => TiffFormat::BigTiff,
            version => return Err(TiffError::InvalidVersion(version)),
        };

        Ok(TiffHeader { byte_order, format })
    }

    #[inline]
    pub const fn is_bigtiff(&self) -> bool {
        matches!(self.format, TiffFormat::BigTiff)
    }
}

/// Determine whether a buffer holds a classic TIFF or a BigTIFF.
///
/// This must run before any directory walk: a BigTIFF buffer is reported
/// as such so callers can reject it without reading 64-bit directories.
pub fn detect_format(bytes: &[u8]) -> Result<TiffFormat, TiffError> {
    TiffHeader::parse(bytes).map(|header| header.format)
}

// =============================================================================
// Tests
// =============================================================================
