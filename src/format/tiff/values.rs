//! TIFF tag value decoding.
//!
//! Tile offsets and byte counts are decoded into `u64` regardless of the
//! field type the writer chose. Integer types widen losslessly; RATIONAL and
//! DOUBLE elements are accepted only when they denote a whole, non-negative
//! number, since anything else cannot be a byte position.

use crate::error::TiffError;

use super::parser::ByteOrder;
use super::tags::{FieldType, TiffTag};

/// Largest double that still converts to `u64` without saturating.
const MAX_EXACT_DOUBLE: f64 = 18_446_744_073_709_549_568.0;

/// Decode `count` elements of `field_type` from `bytes` into `u64` values.
///
/// `bytes` must hold exactly `count * field_type.size_in_bytes()` bytes; the
/// caller slices it out of the header buffer, inline or at the value offset.
pub fn decode_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
    tag: TiffTag,
) -> Result<Vec<u64>, TiffError> {
    let size = field_type.size_in_bytes();
    if bytes.len() < count * size {
        return Err(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!(
                "expected {} bytes for {} values, got {}",
                count * size,
                count,
                bytes.len()
            ),
        });
    }

    bytes
        .chunks_exact(size)
        .take(count)
        .map(|chunk| decode_element(chunk, field_type, byte_order, tag))
        .collect()
}

fn decode_element(
    chunk: &[u8],
    field_type: FieldType,
    byte_order: ByteOrder,
    tag: TiffTag,
) -> Result<u64, TiffError> {
    match field_type {
        FieldType::Byte | FieldType::Ascii | FieldType::Undefined => Ok(chunk[0] as u64),
        FieldType::Short => Ok(byte_order.read_u16([chunk[0], chunk[1]]) as u64),
        FieldType::Long => Ok(byte_order.read_u32(array4(chunk, 0)) as u64),
        FieldType::Long8 => Ok(byte_order.read_u64(array8(chunk))),
        FieldType::Rational => {
            let numerator = byte_order.read_u32(array4(chunk, 0));
            let denominator = byte_order.read_u32(array4(chunk, 4));
            if denominator == 0 || numerator % denominator != 0 {
                return Err(TiffError::InvalidTagValue {
                    tag: tag.name(),
                    message: format!("rational {numerator}/{denominator} is not a whole number"),
                });
            }
            Ok((numerator / denominator) as u64)
        }
        FieldType::Double => {
            let value = byte_order.read_f64(array8(chunk));
            if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_EXACT_DOUBLE
            {
                return Err(TiffError::InvalidTagValue {
                    tag: tag.name(),
                    message: format!("double {value} is not a byte position"),
                });
            }
            Ok(value as u64)
        }
    }
}

#[inline]
fn array4(chunk: &[u8], at: usize) -> [u8; 4] {
    [chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]]
}

#[inline]
fn array8(chunk: &[u8]) -> [u8; 8] {
    [
        chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
    ]
}

// =============================================================================
// Tests
// =============================================================================
