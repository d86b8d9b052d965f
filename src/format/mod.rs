//! Format parsers for source files.
//!
//! Only classic TIFF is understood: enough of it to detect the variant and
//! to locate every tile of every overview level from the header prefix.

pub mod tiff;

pub use tiff::{detect_format, extract_tile_ranges, ByteRange, TiffFormat};
