//! Big-endian loaders for the fixed-width fields that follow a marker.
//!
//! Every multi-byte integer on the wire is big-endian. The decoder only
//! calls these once enough bytes are buffered.

use crate::error::WireError;

/// Load an unsigned big-endian integer of `width` bytes (1, 2, 4 or 8).
///
/// # Errors
///
/// - [`WireError::UnexpectedEof`] if `buf` is shorter than `width`.
/// - [`WireError::UnsupportedWidth`] for any other width.
///
/// # Wire format examples
///
/// | Bytes                 | Width | Value        |
/// |-----------------------|-------|--------------|
/// | `[0x7F]`              | 1     | 127          |
/// | `[0x01, 0x00]`        | 2     | 256          |
/// | `[0x00, 0x01, 0x00, 0x00]` | 4 | 65536       |
pub fn load_uint(buf: &[u8], width: usize) -> Result<u64, WireError> {
    let bytes = buf.get(..width).ok_or(WireError::UnexpectedEof {
        offset: buf.len(),
        needed: width - buf.len().min(width),
    })?;
    match width {
        1 => Ok(u64::from(bytes[0])),
        2 => Ok(u64::from(u16::from_be_bytes([bytes[0], bytes[1]]))),
        4 => Ok(u64::from(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))),
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(u64::from_be_bytes(raw))
        }
        _ => Err(WireError::UnsupportedWidth { width }),
    }
}

/// Load a two's-complement big-endian integer of `width` bytes and sign
/// extend it to `i64`.
///
/// # Errors
///
/// Same as [`load_uint`].
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn load_int(buf: &[u8], width: usize) -> Result<i64, WireError> {
    let raw = load_uint(buf, width)?;
    Ok(match width {
        1 => i64::from(raw as u8 as i8),
        2 => i64::from(raw as u16 as i16),
        4 => i64::from(raw as u32 as i32),
        _ => raw as i64,
    })
}

/// Load an IEEE-754 single from 4 big-endian bytes.
///
/// # Errors
///
/// [`WireError::UnexpectedEof`] if fewer than 4 bytes are available.
#[allow(clippy::cast_possible_truncation)]
pub fn load_f32(buf: &[u8]) -> Result<f32, WireError> {
    Ok(f32::from_bits(load_uint(buf, 4)? as u32))
}

/// Load an IEEE-754 double from 8 big-endian bytes.
///
/// # Errors
///
/// [`WireError::UnexpectedEof`] if fewer than 8 bytes are available.
pub fn load_f64(buf: &[u8]) -> Result<f64, WireError> {
    Ok(f64::from_bits(load_uint(buf, 8)?))
}
