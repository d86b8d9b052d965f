//! Classic TIFF header parser for Cloud-Optimized GeoTIFFs.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets and 12-byte IFD entries.
//!   BigTIFF is detected and rejected; its directories are never walked.
//!
//! - **IFD (Image File Directory)**: A COG carries one IFD per overview level, chained
//!   through next-IFD offsets. Tile locations are accumulated across the whole chain.
//!
//! - **Inline vs offset values**: Values of 4 bytes or less are stored inline in the IFD
//!   entry, larger values are stored at an offset pointed to by the entry.

mod ifd;
mod parser;
mod tags;
mod values;

pub use ifd::{extract_tile_ranges, parse_ifds, ByteRange, Ifd, IfdEntry, IFD_ENTRY_SIZE};
pub use parser::{detect_format, ByteOrder, TiffFormat, TiffHeader, TIFF_HEADER_SIZE};
pub use tags::{FieldType, TiffTag};
pub use values::decode_u64_array;
