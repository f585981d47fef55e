use std::io::Write;

use mpack_types::timestamp::TIMESTAMP_TYPE;
use mpack_types::{Timestamp, Value};
use mpack_wire::Marker;

use crate::error::EncodeError;

/// Streaming serializer that writes each item with the narrowest header
/// able to hold it.
///
/// Scalars and whole [`Value`] trees are written in one call. Payloads
/// can also be written in two steps, header first and body later, so a
/// caller can stream a large string or binary blob without assembling it
/// in memory:
///
/// ```text
/// packer.pack_bin_header(total_len)?;
/// for chunk in source { packer.pack_bin_body(chunk)?; }
/// ```
///
/// The body calls do no bookkeeping: writing fewer or more body bytes
/// than the header declared produces a corrupt stream.
///
/// Header selection:
///
/// ```text
/// ┌───────────┬──────────────┬──────────┬───────────┬───────────┐
/// │ Kind      │ fixed        │ 8-bit    │ 16-bit    │ 32-bit    │
/// ├───────────┼──────────────┼──────────┼───────────┼───────────┤
/// │ uint      │ 0..=127      │ 0xCC     │ 0xCD      │ 0xCE/0xCF │
/// │ int (<0)  │ -32..=-1     │ 0xD0     │ 0xD1      │ 0xD2/0xD3 │
/// │ str       │ len < 32     │ 0xD9     │ 0xDA      │ 0xDB      │
/// │ bin       │ -            │ 0xC4     │ 0xC5      │ 0xC6      │
/// │ ext       │ 1/2/4/8/16   │ 0xC7     │ 0xC8      │ 0xC9      │
/// │ array     │ n < 16       │ -        │ 0xDC      │ 0xDD      │
/// │ map       │ n < 16       │ -        │ 0xDE      │ 0xDF      │
/// └───────────┴──────────────┴──────────┴───────────┴───────────┘
/// ```
pub struct Packer<W: Write> {
    writer: W,
}

impl<W: Write> Packer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume the packer and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn marker(&mut self, marker: Marker) -> Result<(), EncodeError> {
        self.writer.write_all(&[marker.to_u8()])?;
        Ok(())
    }

    fn marker_with(&mut self, marker: Marker, trail: &[u8]) -> Result<(), EncodeError> {
        self.marker(marker)?;
        self.writer.write_all(trail)?;
        Ok(())
    }

    // ── Scalars ─────────────────────────────────────────────────────────

    pub fn pack_nil(&mut self) -> Result<(), EncodeError> {
        self.marker(Marker::Nil)
    }

    pub fn pack_bool(&mut self, v: bool) -> Result<(), EncodeError> {
        self.marker(if v { Marker::True } else { Marker::False })
    }

    /// Write an unsigned integer in the smallest of fixint / uint8..uint64.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pack_uint(&mut self, v: u64) -> Result<(), EncodeError> {
        if v <= 0x7F {
            self.marker(Marker::PositiveFixint(v as u8))
        } else if let Ok(v) = u8::try_from(v) {
            self.marker_with(Marker::U8, &[v])
        } else if let Ok(v) = u16::try_from(v) {
            self.marker_with(Marker::U16, &v.to_be_bytes())
        } else if let Ok(v) = u32::try_from(v) {
            self.marker_with(Marker::U32, &v.to_be_bytes())
        } else {
            self.marker_with(Marker::U64, &v.to_be_bytes())
        }
    }

    /// Write a signed integer. Non-negative input is packed as unsigned,
    /// negative input as negative fixint or int8..int64.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pack_int(&mut self, v: i64) -> Result<(), EncodeError> {
        if v >= 0 {
            return self.pack_uint(v as u64);
        }
        if v >= -32 {
            self.marker(Marker::NegativeFixint(v as i8))
        } else if let Ok(v) = i8::try_from(v) {
            self.marker_with(Marker::I8, &v.to_be_bytes())
        } else if let Ok(v) = i16::try_from(v) {
            self.marker_with(Marker::I16, &v.to_be_bytes())
        } else if let Ok(v) = i32::try_from(v) {
            self.marker_with(Marker::I32, &v.to_be_bytes())
        } else {
            self.marker_with(Marker::I64, &v.to_be_bytes())
        }
    }

    pub fn pack_f32(&mut self, v: f32) -> Result<(), EncodeError> {
        self.marker_with(Marker::F32, &v.to_be_bytes())
    }

    pub fn pack_f64(&mut self, v: f64) -> Result<(), EncodeError> {
        self.marker_with(Marker::F64, &v.to_be_bytes())
    }

    // ── Headers ─────────────────────────────────────────────────────────

    fn sized_header(
        &mut self,
        kind: &'static str,
        len: usize,
        markers: [Marker; 3],
    ) -> Result<(), EncodeError> {
        let [m8, m16, m32] = markers;
        if let Ok(n) = u8::try_from(len) {
            self.marker_with(m8, &[n])
        } else if let Ok(n) = u16::try_from(len) {
            self.marker_with(m16, &n.to_be_bytes())
        } else if let Ok(n) = u32::try_from(len) {
            self.marker_with(m32, &n.to_be_bytes())
        } else {
            Err(EncodeError::LengthOverflow { kind, len })
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn count_header(
        &mut self,
        kind: &'static str,
        count: usize,
        fixed: fn(u8) -> Marker,
        markers: [Marker; 2],
    ) -> Result<(), EncodeError> {
        let [m16, m32] = markers;
        if count < 16 {
            self.marker(fixed(count as u8))
        } else if let Ok(n) = u16::try_from(count) {
            self.marker_with(m16, &n.to_be_bytes())
        } else if let Ok(n) = u32::try_from(count) {
            self.marker_with(m32, &n.to_be_bytes())
        } else {
            Err(EncodeError::LengthOverflow { kind, len: count })
        }
    }

    /// # Errors
    ///
    /// [`EncodeError::LengthOverflow`] if `len` exceeds `u32::MAX`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pack_str_header(&mut self, len: usize) -> Result<(), EncodeError> {
        if len < 32 {
            return self.marker(Marker::FixStr(len as u8));
        }
        self.sized_header("str", len, [Marker::Str8, Marker::Str16, Marker::Str32])
    }

    /// # Errors
    ///
    /// [`EncodeError::LengthOverflow`] if `len` exceeds `u32::MAX`.
    pub fn pack_bin_header(&mut self, len: usize) -> Result<(), EncodeError> {
        self.sized_header("bin", len, [Marker::Bin8, Marker::Bin16, Marker::Bin32])
    }

    /// Write an ext header. Payload lengths of 1, 2, 4, 8 and 16 use the
    /// fixext tags, which carry no length field.
    ///
    /// # Errors
    ///
    /// [`EncodeError::LengthOverflow`] if `len` exceeds `u32::MAX`.
    pub fn pack_ext_header(&mut self, type_tag: i8, len: usize) -> Result<(), EncodeError> {
        let fixed = match len {
            1 => Some(Marker::FixExt1),
            2 => Some(Marker::FixExt2),
            4 => Some(Marker::FixExt4),
            8 => Some(Marker::FixExt8),
            16 => Some(Marker::FixExt16),
            _ => None,
        };
        match fixed {
            Some(marker) => self.marker(marker)?,
            None => self.sized_header("ext", len, [Marker::Ext8, Marker::Ext16, Marker::Ext32])?,
        }
        self.writer.write_all(&type_tag.to_be_bytes())?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`EncodeError::LengthOverflow`] if `count` exceeds `u32::MAX`.
    pub fn pack_array_header(&mut self, count: usize) -> Result<(), EncodeError> {
        self.count_header("array", count, Marker::FixArray, [Marker::Array16, Marker::Array32])
    }

    /// `count` is the number of key/value pairs.
    ///
    /// # Errors
    ///
    /// [`EncodeError::LengthOverflow`] if `count` exceeds `u32::MAX`.
    pub fn pack_map_header(&mut self, count: usize) -> Result<(), EncodeError> {
        self.count_header("map", count, Marker::FixMap, [Marker::Map16, Marker::Map32])
    }

    // ── Bodies ──────────────────────────────────────────────────────────

    pub fn pack_str_body(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn pack_bin_body(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn pack_ext_body(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    // ── Whole payloads ──────────────────────────────────────────────────

    pub fn pack_str(&mut self, text: &str) -> Result<(), EncodeError> {
        self.pack_str_bytes(text.as_bytes())
    }

    /// Write raw bytes with a str header, without checking UTF-8.
    pub fn pack_str_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.pack_str_header(bytes.len())?;
        self.pack_str_body(bytes)
    }

    pub fn pack_bin(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.pack_bin_header(bytes.len())?;
        self.pack_bin_body(bytes)
    }

    pub fn pack_ext(&mut self, type_tag: i8, data: &[u8]) -> Result<(), EncodeError> {
        self.pack_ext_header(type_tag, data.len())?;
        self.pack_ext_body(data)
    }

    /// Write a timestamp as ext type -1 in its smallest form.
    pub fn pack_timestamp(&mut self, ts: &Timestamp) -> Result<(), EncodeError> {
        let mut buf = [0u8; 12];
        let len = ts.encode_into(&mut buf);
        self.pack_ext(TIMESTAMP_TYPE, &buf[..len])
    }

    /// Write a complete value tree.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::LengthOverflow`] if any payload or container is
    ///   larger than a 32-bit header can describe.
    /// - [`EncodeError::Io`] from the writer.
    pub fn pack_value(&mut self, value: &Value<'_>) -> Result<(), EncodeError> {
        match *value {
            Value::Nil => self.pack_nil(),
            Value::Boolean(v) => self.pack_bool(v),
            Value::UInt(v) => self.pack_uint(v),
            Value::Int(v) => self.pack_int(v),
            Value::F32(v) => self.pack_f32(v),
            Value::F64(v) => self.pack_f64(v),
            Value::Str(bytes) => self.pack_str_bytes(bytes),
            Value::Bin(bytes) => self.pack_bin(bytes),
            Value::Ext(ext) => self.pack_ext(ext.type_tag, ext.data),
            Value::Array(items) => {
                self.pack_array_header(items.len())?;
                items.iter().try_for_each(|item| self.pack_value(item))
            }
            Value::Map(pairs) => {
                self.pack_map_header(pairs.len())?;
                pairs.iter().try_for_each(|(key, val)| {
                    self.pack_value(key)?;
                    self.pack_value(val)
                })
            }
        }
    }
}

/// Serialize `value` into a fresh byte vector.
///
/// # Errors
///
/// [`EncodeError::LengthOverflow`] for oversize payloads.
pub fn encode(value: &Value<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(value.zone_size() + 16);
    encode_to(value, &mut out)?;
    Ok(out)
}

/// Serialize `value` into `writer`.
///
/// # Errors
///
/// Same as [`Packer::pack_value`].
pub fn encode_to<W: Write>(value: &Value<'_>, writer: W) -> Result<(), EncodeError> {
    Packer::new(writer).pack_value(value)
}
