//! The resumable decode state machine.
//!
//! `Context` consumes bytes from a caller-owned buffer and builds values
//! into a [`Zone`]. A tag byte is consumed as soon as it is seen; a
//! fixed-width field or a payload body is taken only once all of its bytes
//! are present. When input runs out the offset stays in front of the
//! unfinished field and the next call re-reads it from the (now longer)
//! buffer, so the result does not depend on how the input was chunked.
//!
//! ```text
//!            ┌──────────────┐  fixint, nil, bool, fixstr(0), empty
//!      ┌────►│    Header    │──────── fixarray/fixmap ───────────┐
//!      │     └──────┬───────┘                                    │
//!      │   8/16/32/64-bit tag   fixstr(n), fixext                │
//!      │            ▼                  │                         │
//!      │     ┌──────────────┐          ▼                         ▼
//!      │     │ Trail(marker)│──► ┌──────────┐            ┌──────────────┐
//!      │     └──────┬───────┘    │  Body    │            │ push Frame   │
//!      │            │            └────┬─────┘            └──────────────┘
//!      │            ▼                 ▼
//!      └────── value complete ── fold into parent frames ──► top-level value
//! ```
//!
//! Containers are built on an explicit stack of frames, never by
//! recursion, so input nesting can only grow that stack, bounded by the
//! depth limit.

use std::mem::MaybeUninit;

use mpack_types::{Ext, Value};
use mpack_wire::Marker;
use mpack_wire::endian::{load_f32, load_f64, load_int, load_uint};
use mpack_wire::WireError;
use mpack_zone::Zone;
use tracing::debug;

use crate::config::{DecoderConfig, PayloadKind};
use crate::error::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Expecting a tag byte.
    Header,
    /// Tag read; waiting for its fixed-width field (1, 2, 4 or 8 bytes).
    Trail(Marker),
    /// Waiting for a payload body. For ext, `len` includes the type byte.
    Body { kind: PayloadKind, len: usize },
}

/// One container under construction.
///
/// Element storage is allocated from the zone at its final size when the
/// header is read and filled front to back; it is never resized.
enum Frame<'a> {
    Array {
        slots: &'a mut [MaybeUninit<Value<'a>>],
        filled: usize,
    },
    Map {
        slots: &'a mut [MaybeUninit<(Value<'a>, Value<'a>)>],
        filled: usize,
        key: Option<Value<'a>>,
    },
}

impl<'a> Frame<'a> {
    /// Place the next element. Returns true once the container is full.
    fn push(&mut self, value: Value<'a>) -> bool {
        match self {
            Frame::Array { slots, filled } => {
                slots[*filled].write(value);
                *filled += 1;
                *filled == slots.len()
            }
            Frame::Map { slots, filled, key } => match key.take() {
                None => {
                    *key = Some(value);
                    false
                }
                Some(k) => {
                    slots[*filled].write((k, value));
                    *filled += 1;
                    *filled == slots.len()
                }
            },
        }
    }

    /// Convert a full frame into its value.
    fn into_value(self) -> Value<'a> {
        match self {
            Frame::Array { slots, filled } => {
                debug_assert_eq!(filled, slots.len());
                // SAFETY: only called after `push` reported every slot filled.
                Value::Array(unsafe { assume_init(slots) })
            }
            Frame::Map { slots, filled, .. } => {
                debug_assert_eq!(filled, slots.len());
                // SAFETY: as above.
                Value::Map(unsafe { assume_init(slots) })
            }
        }
    }
}

/// # Safety
///
/// Every element of `slots` must be initialized.
unsafe fn assume_init<T>(slots: &mut [MaybeUninit<T>]) -> &[T] {
    // SAFETY: `MaybeUninit<T>` has the layout of `T`.
    unsafe { &*(std::ptr::from_mut::<[MaybeUninit<T>]>(slots) as *const [T]) }
}

/// Incremental decoder state for one message at a time.
///
/// Call [`execute`](Self::execute) with the whole buffered input and the
/// current offset; it returns `Ok(None)` when more bytes are needed and
/// `Ok(Some(value))` once a top-level value is complete, after which the
/// context is ready for the next message.
pub struct Context<'a> {
    state: State,
    stack: Vec<Frame<'a>>,
    config: DecoderConfig,
    referenced: bool,
    shortfall: usize,
}

impl<'a> Context<'a> {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            state: State::Header,
            stack: Vec::new(),
            config,
            referenced: false,
            shortfall: 0,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Abandon any partially decoded message.
    pub fn reset(&mut self) {
        self.state = State::Header;
        self.stack.clear();
        self.referenced = false;
        self.shortfall = 0;
    }

    /// True when no message is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == State::Header && self.stack.is_empty()
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether any payload since the last [`take_referenced`](Self::take_referenced)
    /// borrows the input buffer.
    pub fn referenced(&self) -> bool {
        self.referenced
    }

    pub fn take_referenced(&mut self) -> bool {
        std::mem::take(&mut self.referenced)
    }

    /// Minimum number of extra bytes the last `Ok(None)` was waiting for.
    pub fn shortfall(&self) -> usize {
        self.shortfall
    }

    /// Decode from `data[*off..]`, advancing `*off` past every token that
    /// was fully consumed.
    ///
    /// `data` must contain every byte passed in earlier calls for the
    /// same message at the same positions; only the tail may grow.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Parse`] on the reserved tag byte.
    /// - A size or depth overflow when a header exceeds the limits.
    /// - [`DecodeError::Alloc`] if the zone cannot allocate.
    ///
    /// After an error the context must be [`reset`](Self::reset) before
    /// it is used again.
    pub fn execute(
        &mut self,
        data: &'a [u8],
        off: &mut usize,
        zone: &'a Zone,
    ) -> Result<Option<Value<'a>>, DecodeError> {
        loop {
            let produced = match self.state {
                State::Header => {
                    let Some(&byte) = data.get(*off) else {
                        self.shortfall = 1;
                        return Ok(None);
                    };
                    let marker = Marker::from_u8(byte);
                    if marker == Marker::Reserved {
                        return Err(DecodeError::Parse { offset: *off, byte });
                    }
                    *off += 1;
                    self.header(marker, zone)?
                }
                State::Trail(marker) => {
                    let width = marker.trail_len();
                    let Some(field) = data.get(*off..*off + width) else {
                        self.shortfall = *off + width - data.len();
                        return Ok(None);
                    };
                    *off += width;
                    self.state = State::Header;
                    self.trail(marker, field, zone)?
                }
                State::Body { kind, len } => {
                    let Some(body) = data.get(*off..off.saturating_add(len)) else {
                        self.shortfall = off.saturating_add(len) - data.len();
                        return Ok(None);
                    };
                    *off += len;
                    self.state = State::Header;
                    Some(self.payload(kind, body, zone)?)
                }
            };

            if let Some(value) = produced {
                if let Some(done) = self.fold(value) {
                    self.shortfall = 0;
                    return Ok(Some(done));
                }
            }
        }
    }

    /// Route a completed value into its parent, completing parents in
    /// turn. Returns the top-level value once the stack is empty.
    fn fold(&mut self, mut value: Value<'a>) -> Option<Value<'a>> {
        while let Some(top) = self.stack.last_mut() {
            if !top.push(value) {
                return None;
            }
            let frame = self.stack.pop()?;
            value = frame.into_value();
        }
        Some(value)
    }

    fn header(&mut self, marker: Marker, zone: &'a Zone) -> Result<Option<Value<'a>>, DecodeError> {
        Ok(match marker {
            Marker::PositiveFixint(v) => Some(Value::UInt(u64::from(v))),
            Marker::NegativeFixint(v) => Some(Value::Int(i64::from(v))),
            Marker::Nil => Some(Value::Nil),
            Marker::False => Some(Value::Boolean(false)),
            Marker::True => Some(Value::Boolean(true)),
            Marker::FixStr(len) => self.begin_payload(PayloadKind::Str, usize::from(len))?,
            Marker::FixArray(count) => self.begin_array(usize::from(count), zone)?,
            Marker::FixMap(count) => self.begin_map(usize::from(count), zone)?,
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16 => {
                self.begin_ext(marker.fixext_len().unwrap_or_default())?;
                None
            }
            _ => {
                self.state = State::Trail(marker);
                None
            }
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn trail(
        &mut self,
        marker: Marker,
        field: &[u8],
        zone: &'a Zone,
    ) -> Result<Option<Value<'a>>, DecodeError> {
        let width = field.len();
        Ok(match marker {
            Marker::U8 | Marker::U16 | Marker::U32 | Marker::U64 => {
                Some(Value::UInt(load_uint(field, width)?))
            }
            // Non-negative signed integers come out as UInt
            Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
                Some(Value::from(load_int(field, width)?))
            }
            Marker::F32 => Some(Value::F32(load_f32(field)?)),
            Marker::F64 => Some(Value::F64(load_f64(field)?)),
            Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                self.begin_payload(PayloadKind::Str, load_uint(field, width)? as usize)?
            }
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => {
                self.begin_payload(PayloadKind::Bin, load_uint(field, width)? as usize)?
            }
            Marker::Ext8 | Marker::Ext16 | Marker::Ext32 => {
                self.begin_ext(load_uint(field, width)? as usize)?;
                None
            }
            Marker::Array16 | Marker::Array32 => {
                self.begin_array(load_uint(field, width)? as usize, zone)?
            }
            Marker::Map16 | Marker::Map32 => {
                self.begin_map(load_uint(field, width)? as usize, zone)?
            }
            // `header` only enters `Trail` for the markers above
            other => unreachable!("{other:?} has no trailing field"),
        })
    }

    fn begin_payload(&mut self, kind: PayloadKind, len: usize) -> Result<Option<Value<'a>>, DecodeError> {
        let limits = &self.config.limits;
        let limit = match kind {
            PayloadKind::Str => limits.str,
            PayloadKind::Bin => limits.bin,
            PayloadKind::Ext => limits.ext,
        };
        if len > limit {
            debug!(?kind, declared = len, limit, "payload size limit exceeded");
            return Err(match kind {
                PayloadKind::Str => DecodeError::StrSizeOverflow { declared: len, limit },
                PayloadKind::Bin => DecodeError::BinSizeOverflow { declared: len, limit },
                PayloadKind::Ext => DecodeError::ExtSizeOverflow { declared: len, limit },
            });
        }
        if len == 0 {
            return Ok(Some(match kind {
                PayloadKind::Bin => Value::Bin(&[]),
                _ => Value::Str(&[]),
            }));
        }
        self.state = State::Body { kind, len };
        Ok(None)
    }

    /// `payload_len` excludes the type byte; the limit check includes it.
    fn begin_ext(&mut self, payload_len: usize) -> Result<(), DecodeError> {
        let declared = payload_len.saturating_add(1);
        let limit = self.config.limits.ext;
        if declared > limit {
            debug!(declared, limit, "ext size limit exceeded");
            return Err(DecodeError::ExtSizeOverflow { declared, limit });
        }
        self.state = State::Body {
            kind: PayloadKind::Ext,
            len: declared,
        };
        Ok(())
    }

    fn check_depth(&self) -> Result<(), DecodeError> {
        let limit = self.config.limits.depth;
        if self.stack.len() >= limit {
            debug!(limit, "depth limit exceeded");
            return Err(DecodeError::DepthOverflow { limit });
        }
        Ok(())
    }

    fn begin_array(&mut self, count: usize, zone: &'a Zone) -> Result<Option<Value<'a>>, DecodeError> {
        let limit = self.config.limits.array;
        if count > limit {
            debug!(declared = count, limit, "array size limit exceeded");
            return Err(DecodeError::ArraySizeOverflow { declared: count, limit });
        }
        if count == 0 {
            return Ok(Some(Value::Array(&[])));
        }
        self.check_depth()?;
        let slots = zone.alloc_uninit_slice::<Value<'a>>(count)?;
        self.stack.push(Frame::Array { slots, filled: 0 });
        Ok(None)
    }

    fn begin_map(&mut self, count: usize, zone: &'a Zone) -> Result<Option<Value<'a>>, DecodeError> {
        let limit = self.config.limits.map;
        if count > limit {
            debug!(declared = count, limit, "map size limit exceeded");
            return Err(DecodeError::MapSizeOverflow { declared: count, limit });
        }
        if count == 0 {
            return Ok(Some(Value::Map(&[])));
        }
        self.check_depth()?;
        let slots = zone.alloc_uninit_slice::<(Value<'a>, Value<'a>)>(count)?;
        self.stack.push(Frame::Map {
            slots,
            filled: 0,
            key: None,
        });
        Ok(None)
    }

    /// Turn a complete body into a value, borrowing or copying it as the
    /// reference policy decides.
    #[allow(clippy::cast_possible_wrap)]
    fn payload(&mut self, kind: PayloadKind, body: &'a [u8], zone: &'a Zone) -> Result<Value<'a>, DecodeError> {
        let stored: &'a [u8] = if self.config.reference.should_reference(kind, body.len()) {
            self.referenced = true;
            body
        } else {
            zone.alloc_bytes(body)?
        };
        Ok(match kind {
            PayloadKind::Str => Value::Str(stored),
            PayloadKind::Bin => Value::Bin(stored),
            PayloadKind::Ext => {
                let (&type_tag, data) = stored
                    .split_first()
                    .ok_or(WireError::UnexpectedEof { offset: 0, needed: 1 })?;
                Value::Ext(Ext::new(type_tag as i8, data))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReferencePolicy, UnpackLimits};

    fn run<'a>(
        ctx: &mut Context<'a>,
        data: &'a [u8],
        zone: &'a Zone,
    ) -> Result<Option<Value<'a>>, DecodeError> {
        let mut off = 0;
        ctx.execute(data, &mut off, zone)
    }

    #[test]
    fn scalars() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        assert_eq!(run(&mut ctx, &[0x05], &zone).unwrap(), Some(Value::UInt(5)));
        assert_eq!(run(&mut ctx, &[0xFF], &zone).unwrap(), Some(Value::Int(-1)));
        assert_eq!(run(&mut ctx, &[0xC0], &zone).unwrap(), Some(Value::Nil));
        assert_eq!(run(&mut ctx, &[0xC3], &zone).unwrap(), Some(Value::Boolean(true)));
        assert_eq!(
            run(&mut ctx, &[0xD0, 0x05], &zone).unwrap(),
            Some(Value::UInt(5))
        );
        assert_eq!(
            run(&mut ctx, &[0xD1, 0xFF, 0x00], &zone).unwrap(),
            Some(Value::Int(-256))
        );
    }

    #[test]
    fn resumes_mid_token() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        let full = [0xCD, 0x01, 0x00];
        let mut off = 0;

        assert_eq!(ctx.execute(&full[..2], &mut off, &zone).unwrap(), None);
        assert_eq!(off, 1, "tag consumed, partial field left in place");
        assert_eq!(ctx.shortfall(), 1);

        assert_eq!(
            ctx.execute(&full, &mut off, &zone).unwrap(),
            Some(Value::UInt(256))
        );
        assert_eq!(off, 3);
        assert!(ctx.is_idle());
    }

    #[test]
    fn nested_containers_fold() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        // {"a": [1, [2]], 3: {}}
        let data = [0x82, 0xA1, b'a', 0x92, 0x01, 0x91, 0x02, 0x03, 0x80];
        let value = run(&mut ctx, &data, &zone).unwrap().unwrap();
        let pairs = value.as_map().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, Value::Str(b"a"));
        let list = pairs[0].1.as_array().unwrap();
        assert_eq!(list[0], Value::UInt(1));
        assert_eq!(list[1].as_array().unwrap(), &[Value::UInt(2)]);
        assert_eq!(pairs[1], (Value::UInt(3), Value::Map(&[])));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn referenced_payload_points_into_input() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        let data = [0xA3, b'a', b'b', b'c'];
        let Some(Value::Str(s)) = run(&mut ctx, &data, &zone).unwrap() else {
            panic!("expected str");
        };
        assert_eq!(s.as_ptr(), data[1..].as_ptr());
        assert!(ctx.take_referenced());
        assert!(!ctx.referenced());
    }

    #[test]
    fn copy_policy_copies_into_zone() {
        let zone = Zone::new();
        let config = DecoderConfig::default().with_reference(ReferencePolicy::Never);
        let mut ctx = Context::new(config);
        let data = [0xC4, 0x02, 0xAA, 0xBB];
        let Some(Value::Bin(b)) = run(&mut ctx, &data, &zone).unwrap() else {
            panic!("expected bin");
        };
        assert_eq!(b, &[0xAA, 0xBB]);
        assert_ne!(b.as_ptr(), data[2..].as_ptr());
        assert!(!ctx.referenced());
    }

    #[test]
    fn ext_splits_type_byte() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        let value = run(&mut ctx, &[0xD5, 0xFE, 0x01, 0x02], &zone).unwrap();
        assert_eq!(value, Some(Value::Ext(Ext::new(-2, &[1, 2]))));
        let value = run(&mut ctx, &[0xC7, 0x00, 0x07], &zone).unwrap();
        assert_eq!(value, Some(Value::Ext(Ext::new(7, &[]))));
    }

    #[test]
    fn reserved_byte_is_parse_error() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        let err = run(&mut ctx, &[0x91, 0xC1], &zone).unwrap_err();
        assert!(matches!(err, DecodeError::Parse { offset: 1, byte: 0xC1 }));
    }

    #[test]
    fn every_other_tag_byte_decodes() {
        let zone = Zone::new();
        for byte in (0..=u8::MAX).filter(|&b| b != 0xC1) {
            // Zero bytes after the tag read as zero lengths, counts and elements
            let mut data = vec![byte];
            data.extend_from_slice(&[0; 40]);
            let mut ctx = Context::new(DecoderConfig::default());
            let value = run(&mut ctx, &data, &zone);
            assert!(matches!(value, Ok(Some(_))), "byte {byte:#04x}: {value:?}");
        }
    }

    #[test]
    fn limits_checked_at_header() {
        let zone = Zone::new();
        let limits = UnpackLimits::default().with_str(2);
        let mut ctx = Context::new(DecoderConfig::default().with_limits(limits));
        // Body absent: rejected from the length alone
        let err = run(&mut ctx, &[0xA3], &zone).unwrap_err();
        assert!(matches!(err, DecodeError::StrSizeOverflow { declared: 3, limit: 2 }));
    }

    #[test]
    fn depth_counts_open_containers() {
        let zone = Zone::new();
        let data = [0x91, 0x91, 0x01];
        let two = DecoderConfig::default().with_limits(UnpackLimits::default().with_depth(2));
        assert!(run(&mut Context::new(two), &data, &zone).unwrap().is_some());

        let one = DecoderConfig::default().with_limits(UnpackLimits::default().with_depth(1));
        let err = run(&mut Context::new(one), &data, &zone).unwrap_err();
        assert!(matches!(err, DecodeError::DepthOverflow { limit: 1 }));
    }

    #[test]
    fn huge_declared_count_does_not_touch_memory() {
        let zone = Zone::new();
        let mut ctx = Context::new(DecoderConfig::default());
        // array16 of 65535 elements, only the first present
        let data = [0xDC, 0xFF, 0xFF, 0x01];
        assert_eq!(run(&mut ctx, &data, &zone).unwrap(), None);
        assert_eq!(ctx.depth(), 1);
        ctx.reset();
        assert!(ctx.is_idle());
    }
}
