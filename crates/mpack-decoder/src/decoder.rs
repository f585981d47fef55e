//! One-shot decoding of a complete in-memory buffer.

use bytes::Bytes;
use mpack_types::Value;
use mpack_zone::Zone;

use crate::config::DecoderConfig;
use crate::context::Context;
use crate::error::DecodeError;
use crate::handle::{ObjectHandle, extend};

/// The result of a one-shot decode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decoded<'a> {
    pub value: Value<'a>,
    /// Whether any payload borrows the input buffer rather than the zone.
    /// When false the value depends on the zone alone.
    pub referenced: bool,
}

/// Decode one value from `data[*offset..]` into `zone`.
///
/// On success `*offset` moves past the value; bytes after it are left for
/// the next call, so a buffer holding several concatenated messages can
/// be walked by calling this in a loop until `*offset == data.len()`.
///
/// ```text
///   data:  [ msg 0 ][ msg 1 ][ msg 2 ]
///           ^offset  ^offset after first call
/// ```
///
/// # Errors
///
/// - [`DecodeError::InsufficientBytes`] if `data` ends mid-value;
///   `*offset` is left unchanged.
/// - Any parse, limit or allocation error from [`Context::execute`].
pub fn decode<'a>(
    data: &'a [u8],
    offset: &mut usize,
    zone: &'a Zone,
    config: &DecoderConfig,
) -> Result<Decoded<'a>, DecodeError> {
    let mut ctx = Context::new(*config);
    let mut off = *offset;
    match ctx.execute(data, &mut off, zone)? {
        Some(value) => {
            *offset = off;
            Ok(Decoded {
                value,
                referenced: ctx.referenced(),
            })
        }
        None => Err(DecodeError::InsufficientBytes {
            needed: ctx.shortfall(),
        }),
    }
}

/// Decode exactly one value that spans all of `data`.
///
/// # Errors
///
/// [`DecodeError::TrailingData`] if bytes remain after the value, plus
/// everything [`decode`] can return.
pub fn decode_exact<'a>(
    data: &'a [u8],
    zone: &'a Zone,
    config: &DecoderConfig,
) -> Result<Decoded<'a>, DecodeError> {
    let mut offset = 0;
    let decoded = decode(data, &mut offset, zone, config)?;
    if offset < data.len() {
        return Err(DecodeError::TrailingData {
            extra_bytes: data.len() - offset,
        });
    }
    Ok(decoded)
}

/// Decode one value from a shared buffer into a self-contained handle.
///
/// Referenced payloads keep a share of `data` alive inside the handle's
/// zone, so the handle outlives the caller's `Bytes`.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_bytes(
    data: &Bytes,
    offset: &mut usize,
    config: &DecoderConfig,
) -> Result<ObjectHandle, DecodeError> {
    let zone = Zone::new();
    let mut off = *offset;
    let decoded = decode(data, &mut off, &zone, config)?;
    // SAFETY: the value borrows the zone's chunks and `data`'s storage;
    // the latter is pinned by the finalizer registered below.
    let value = unsafe { extend(decoded.value) };
    if decoded.referenced {
        let keep = data.clone();
        zone.push_finalizer(move || drop(keep));
    }
    *offset = off;
    // SAFETY: as above.
    Ok(unsafe { ObjectHandle::from_parts(value, zone) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferencePolicy;

    #[test]
    fn walks_concatenated_messages() {
        let data = hex::decode("01a2686992c0c3").unwrap();
        let zone = Zone::new();
        let config = DecoderConfig::default();
        let mut offset = 0;
        let mut out = Vec::new();
        while offset < data.len() {
            out.push(decode(&data, &mut offset, &zone, &config).unwrap().value);
        }
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], Value::Str(b"hi"));
        assert_eq!(out[2], Value::Array(&[Value::Nil, Value::Boolean(true)]));
    }

    #[test]
    fn truncated_input_keeps_offset() {
        let zone = Zone::new();
        let data = [0x92, 0x01];
        let mut offset = 0;
        let err = decode(&data, &mut offset, &zone, &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, DecodeError::InsufficientBytes { needed: 1 }));
        assert_eq!(offset, 0);
    }

    #[test]
    fn empty_input_is_insufficient() {
        let zone = Zone::new();
        let err = decode_exact(&[], &zone, &DecoderConfig::default()).unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn exact_rejects_trailing_bytes() {
        let zone = Zone::new();
        let err = decode_exact(&[0xC0, 0xC0, 0xC0], &zone, &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingData { extra_bytes: 2 }));
    }

    #[test]
    fn referenced_flag_follows_policy() {
        let zone = Zone::new();
        let data = [0xA1, b'x'];
        let referenced = decode_exact(&data, &zone, &DecoderConfig::default()).unwrap();
        assert!(referenced.referenced);

        let copy = DecoderConfig::default().with_reference(ReferencePolicy::Never);
        let copied = decode_exact(&data, &zone, &copy).unwrap();
        assert!(!copied.referenced);
        assert_eq!(copied.value, referenced.value);
    }

    #[test]
    fn scalars_never_reference() {
        let zone = Zone::new();
        let decoded = decode_exact(&[0x93, 0x01, 0xA0, 0xC4, 0x00], &zone, &DecoderConfig::default()).unwrap();
        assert!(!decoded.referenced);
    }

    #[test]
    fn bytes_handle_outlives_input() {
        let data = Bytes::from(hex::decode("82a16b01a176c403010203").unwrap());
        let mut offset = 0;
        let handle = decode_bytes(&data, &mut offset, &DecoderConfig::default()).unwrap();
        assert_eq!(offset, data.len());
        assert_eq!(handle.zone().finalizer_count(), 1);
        drop(data);
        assert_eq!(
            handle.get().get(&Value::Str(b"v")),
            Some(&Value::Bin(&[1, 2, 3]))
        );
    }
}
