//! IFD (Image File Directory) walking and tile range extraction.
//!
//! A COG header prefix holds a chain of classic TIFF directories, one per
//! resolution level. Each directory is laid out as:
//!
//! ```text
//! Bytes 0-1:          Entry count N
//! Bytes 2..2+12N:     N entries of 12 bytes each
//!                       0-1  tag id
//!                       2-3  field type
//!                       4-7  value count
//!                       8-11 value (if it fits in 4 bytes) or offset to it
//! Bytes 2+12N..+4:    Offset of the next IFD (0 ends the chain)
//! ```
//!
//! Every read is bounds-checked against the header buffer. A directory or
//! value that lies past the fetched prefix is reported as
//! [`TiffError::Truncated`] instead of being read from garbage.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::TiffError;

use super::parser::{ByteOrder, TiffHeader, TIFF_HEADER_SIZE};
use super::tags::{FieldType, TiffTag};
use super::values::decode_u64_array;

/// Size of a classic TIFF IFD entry in bytes.
pub const IFD_ENTRY_SIZE: usize = 12;

/// Size of the entry count field at the start of an IFD.
const IFD_COUNT_SIZE: usize = 2;

/// Size of the next-IFD offset field at the end of an IFD.
const IFD_NEXT_OFFSET_SIZE: usize = 4;

// =============================================================================
// ByteRange
// =============================================================================

/// Location of one tile inside the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteRange {
    /// Offset of the first byte of the tile
    pub offset: u64,

    /// Number of bytes in the tile
    pub length: u64,
}

impl ByteRange {
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte of the tile.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

// =============================================================================
// HeaderBuffer
// =============================================================================

/// Bounds-checked view of the fetched header prefix.
#[derive(Debug, Clone, Copy)]
struct HeaderBuffer<'a> {
    bytes: &'a [u8],
    byte_order: ByteOrder,
}

impl<'a> HeaderBuffer<'a> {
    fn slice(&self, offset: u64, len: u64) -> Result<&'a [u8], TiffError> {
        let truncated = || TiffError::Truncated {
            offset,
            len,
            size: self.bytes.len(),
        };

        let end = offset.checked_add(len).ok_or_else(truncated)?;
        if end > self.bytes.len() as u64 {
            return Err(truncated());
        }
        Ok(&self.bytes[offset as usize..end as usize])
    }

    fn read_u16(&self, offset: u64) -> Result<u16, TiffError> {
        let b = self.slice(offset, 2)?;
        Ok(self.byte_order.read_u16([b[0], b[1]]))
    }

    fn read_u32(&self, offset: u64) -> Result<u32, TiffError> {
        let b = self.slice(offset, 4)?;
        Ok(self.byte_order.read_u32([b[0], b[1], b[2], b[3]]))
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// A single 12-byte IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Tag identifier
    pub tag_id: u16,

    /// Raw field type code (kept even when outside the type table)
    pub field_type_raw: u16,

    /// Number of values
    pub count: u32,

    /// Raw value field: the value itself when inline, else its offset
    pub value_offset_bytes: [u8; 4],
}

impl IfdEntry {
    fn parse(bytes: &[u8], byte_order: ByteOrder) -> Self {
        Self {
            tag_id: byte_order.read_u16([bytes[0], bytes[1]]),
            field_type_raw: byte_order.read_u16([bytes[2], bytes[3]]),
            count: byte_order.read_u32([bytes[4], bytes[5], bytes[6], bytes[7]]),
            value_offset_bytes: [bytes[8], bytes[9], bytes[10], bytes[11]],
        }
    }

    /// Field type, or `None` when the code is not in the type table.
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_u16(self.field_type_raw)
    }

    /// Interpret the value field as an offset into the file.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        byte_order.read_u32(self.value_offset_bytes) as u64
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// Position of this directory in the chain (0 = first)
    pub index: usize,

    /// Byte offset of this directory in the file
    pub offset: u64,

    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next directory (0 = end of chain)
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Total size in bytes of an IFD with `entry_count` entries.
    pub const fn calculate_size(entry_count: u16) -> usize {
        IFD_COUNT_SIZE + entry_count as usize * IFD_ENTRY_SIZE + IFD_NEXT_OFFSET_SIZE
    }

    fn parse(buffer: &HeaderBuffer<'_>, offset: u64, index: usize) -> Result<Self, TiffError> {
        let entry_count = buffer.read_u16(offset)?;
        let body = buffer.slice(
            offset + IFD_COUNT_SIZE as u64,
            entry_count as u64 * IFD_ENTRY_SIZE as u64,
        )?;

        let entries = body
            .chunks_exact(IFD_ENTRY_SIZE)
            .map(|raw| IfdEntry::parse(raw, buffer.byte_order))
            .collect();

        let next_offset_at = offset + (IFD_COUNT_SIZE + body.len()) as u64;
        let next_ifd_offset = buffer.read_u32(next_offset_at)? as u64;

        Ok(Self {
            index,
            offset,
            entries,
            next_ifd_offset,
        })
    }

    /// Find the first entry carrying `tag`.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag_id == tag.as_u16())
    }

    /// Decode the values of `tag` from the header buffer.
    fn read_tag(&self, buffer: &HeaderBuffer<'_>, tag: TiffTag) -> Result<Vec<u64>, TiffError> {
        let entry = self.get_entry_by_tag(tag).ok_or(TiffError::MissingTag {
            ifd: self.index,
            tag: tag.name(),
        })?;

        let field_type = entry.field_type().ok_or(TiffError::UnknownFieldType {
            tag: entry.tag_id,
            field_type: entry.field_type_raw,
        })?;

        let len = field_type.byte_len(entry.count);
        let bytes = if field_type.fits_inline(entry.count) {
            &entry.value_offset_bytes[..len as usize]
        } else {
            buffer.slice(entry.value_offset(buffer.byte_order), len)?
        };

        decode_u64_array(
            bytes,
            entry.count as usize,
            field_type,
            buffer.byte_order,
            tag,
        )
    }

    /// Pair TileOffsets with TileByteCounts, in tile order.
    fn tile_ranges(&self, buffer: &HeaderBuffer<'_>) -> Result<Vec<ByteRange>, TiffError> {
        let offsets = self.read_tag(buffer, TiffTag::TileOffsets)?;
        let byte_counts = self.read_tag(buffer, TiffTag::TileByteCounts)?;

        if offsets.len() != byte_counts.len() {
            return Err(TiffError::CountMismatch {
                ifd: self.index,
                offsets: offsets.len(),
                byte_counts: byte_counts.len(),
            });
        }

        Ok(offsets
            .into_iter()
            .zip(byte_counts)
            .map(|(offset, length)| ByteRange::new(offset, length))
            .collect())
    }
}

// =============================================================================
// Chain walking
// =============================================================================

/// Parse every IFD in the chain of a classic TIFF header buffer.
///
/// # Errors
/// - `UnsupportedBigTiff` for BigTIFF buffers
/// - `Truncated` if a directory does not fit in the buffer
/// - `IfdCycle` if the chain revisits a directory
pub fn parse_ifds(bytes: &[u8]) -> Result<Vec<Ifd>, TiffError> {
    let header = TiffHeader::parse(bytes)?;
    if header.is_bigtiff() {
        return Err(TiffError::UnsupportedBigTiff);
    }

    let buffer = HeaderBuffer {
        bytes,
        byte_order: header.byte_order,
    };

    let mut ifds = Vec::new();
    let mut visited = HashSet::new();
    let mut next_offset = buffer.read_u32(TIFF_HEADER_SIZE as u64 - 4)? as u64;

    while next_offset != 0 {
        if !visited.insert(next_offset) {
            return Err(TiffError::IfdCycle(next_offset));
        }

        let ifd = Ifd::parse(&buffer, next_offset, ifds.len())?;
        next_offset = ifd.next_ifd_offset;
        ifds.push(ifd);
    }

    Ok(ifds)
}

/// Extract the byte range of every tile in every IFD of the chain.
///
/// Ranges are returned in IFD order, then tile order within each IFD.
pub fn extract_tile_ranges(bytes: &[u8]) -> Result<Vec<ByteRange>, TiffError> {
    let header = TiffHeader::parse(bytes)?;
    let buffer = HeaderBuffer {
        bytes,
        byte_order: header.byte_order,
    };

    let mut ranges = Vec::new();
    for ifd in parse_ifds(bytes)? {
        ranges.extend(ifd.tile_ranges(&buffer)?);
    }
    Ok(ranges)
}

// =============================================================================
// Tests
// =============================================================================
