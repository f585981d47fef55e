/// Raw tag byte constants.
///
/// Fixed-range families (fixint, fixmap, fixarray, fixstr) are described by
/// their first byte; the remaining tags are single values.
pub mod tag {
    pub const POSITIVE_FIXINT_MAX: u8 = 0x7F;
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xA0;
    pub const NIL: u8 = 0xC0;
    pub const RESERVED: u8 = 0xC1;
    pub const FALSE: u8 = 0xC2;
    pub const TRUE: u8 = 0xC3;
    pub const BIN8: u8 = 0xC4;
    pub const BIN16: u8 = 0xC5;
    pub const BIN32: u8 = 0xC6;
    pub const EXT8: u8 = 0xC7;
    pub const EXT16: u8 = 0xC8;
    pub const EXT32: u8 = 0xC9;
    pub const FLOAT32: u8 = 0xCA;
    pub const FLOAT64: u8 = 0xCB;
    pub const UINT8: u8 = 0xCC;
    pub const UINT16: u8 = 0xCD;
    pub const UINT32: u8 = 0xCE;
    pub const UINT64: u8 = 0xCF;
    pub const INT8: u8 = 0xD0;
    pub const INT16: u8 = 0xD1;
    pub const INT32: u8 = 0xD2;
    pub const INT64: u8 = 0xD3;
    pub const FIXEXT1: u8 = 0xD4;
    pub const FIXEXT2: u8 = 0xD5;
    pub const FIXEXT4: u8 = 0xD6;
    pub const FIXEXT8: u8 = 0xD7;
    pub const FIXEXT16: u8 = 0xD8;
    pub const STR8: u8 = 0xD9;
    pub const STR16: u8 = 0xDA;
    pub const STR32: u8 = 0xDB;
    pub const ARRAY16: u8 = 0xDC;
    pub const ARRAY32: u8 = 0xDD;
    pub const MAP16: u8 = 0xDE;
    pub const MAP32: u8 = 0xDF;
    pub const NEGATIVE_FIXINT_MIN: u8 = 0xE0;
}

/// Classification of a single tag byte.
///
/// Every byte value maps to exactly one variant. Fixed-range families carry
/// the value or length packed into the low bits so the decoder can act on
/// them without a second lookup.
///
/// ```text
/// ┌───────────┬──────────────────┬──────────────────────────────────┐
/// │ Byte      │ Variant          │ Trailing header bytes            │
/// ├───────────┼──────────────────┼──────────────────────────────────┤
/// │ 0x00-0x7F │ PositiveFixint   │ 0                                │
/// │ 0x80-0x8F │ FixMap           │ 0 (count in low nibble)          │
/// │ 0x90-0x9F │ FixArray         │ 0 (count in low nibble)          │
/// │ 0xA0-0xBF │ FixStr           │ 0 (length in low 5 bits)         │
/// │ 0xC0      │ Nil              │ 0                                │
/// │ 0xC1      │ Reserved         │ never valid                      │
/// │ 0xC4-0xC6 │ Bin8/16/32       │ 1/2/4 length                     │
/// │ 0xC7-0xC9 │ Ext8/16/32       │ 1/2/4 length, then type byte     │
/// │ 0xCA/0xCB │ F32/F64          │ 4/8                              │
/// │ 0xCC-0xCF │ U8..U64          │ 1/2/4/8                          │
/// │ 0xD0-0xD3 │ I8..I64          │ 1/2/4/8                          │
/// │ 0xD4-0xD8 │ FixExt1..16      │ 1 type byte + 1/2/4/8/16 payload │
/// │ 0xD9-0xDB │ Str8/16/32       │ 1/2/4 length                     │
/// │ 0xDC/0xDD │ Array16/32       │ 2/4 count                        │
/// │ 0xDE/0xDF │ Map16/32         │ 2/4 count                        │
/// │ 0xE0-0xFF │ NegativeFixint   │ 0                                │
/// └───────────┴──────────────────┴──────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    PositiveFixint(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    F32,
    F64,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegativeFixint(i8),
}

impl Marker {
    /// Classify a tag byte. Total: every input produces a variant.
    #[allow(clippy::cast_possible_wrap)]
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0x00..=0x7F => Self::PositiveFixint(byte),
            0x80..=0x8F => Self::FixMap(byte & 0x0F),
            0x90..=0x9F => Self::FixArray(byte & 0x0F),
            0xA0..=0xBF => Self::FixStr(byte & 0x1F),
            tag::NIL => Self::Nil,
            tag::RESERVED => Self::Reserved,
            tag::FALSE => Self::False,
            tag::TRUE => Self::True,
            tag::BIN8 => Self::Bin8,
            tag::BIN16 => Self::Bin16,
            tag::BIN32 => Self::Bin32,
            tag::EXT8 => Self::Ext8,
            tag::EXT16 => Self::Ext16,
            tag::EXT32 => Self::Ext32,
            tag::FLOAT32 => Self::F32,
            tag::FLOAT64 => Self::F64,
            tag::UINT8 => Self::U8,
            tag::UINT16 => Self::U16,
            tag::UINT32 => Self::U32,
            tag::UINT64 => Self::U64,
            tag::INT8 => Self::I8,
            tag::INT16 => Self::I16,
            tag::INT32 => Self::I32,
            tag::INT64 => Self::I64,
            tag::FIXEXT1 => Self::FixExt1,
            tag::FIXEXT2 => Self::FixExt2,
            tag::FIXEXT4 => Self::FixExt4,
            tag::FIXEXT8 => Self::FixExt8,
            tag::FIXEXT16 => Self::FixExt16,
            tag::STR8 => Self::Str8,
            tag::STR16 => Self::Str16,
            tag::STR32 => Self::Str32,
            tag::ARRAY16 => Self::Array16,
            tag::ARRAY32 => Self::Array32,
            tag::MAP16 => Self::Map16,
            tag::MAP32 => Self::Map32,
            0xE0..=0xFF => Self::NegativeFixint(byte as i8),
        }
    }

    /// Return the wire byte for this marker.
    ///
    /// Fixed-range payloads are masked into range, so `FixStr(40)` encodes
    /// as `0xA8` rather than spilling into the next family.
    #[allow(clippy::cast_sign_loss)]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::PositiveFixint(v) => v & 0x7F,
            Self::FixMap(n) => tag::FIXMAP | (n & 0x0F),
            Self::FixArray(n) => tag::FIXARRAY | (n & 0x0F),
            Self::FixStr(n) => tag::FIXSTR | (n & 0x1F),
            Self::Nil => tag::NIL,
            Self::Reserved => tag::RESERVED,
            Self::False => tag::FALSE,
            Self::True => tag::TRUE,
            Self::Bin8 => tag::BIN8,
            Self::Bin16 => tag::BIN16,
            Self::Bin32 => tag::BIN32,
            Self::Ext8 => tag::EXT8,
            Self::Ext16 => tag::EXT16,
            Self::Ext32 => tag::EXT32,
            Self::F32 => tag::FLOAT32,
            Self::F64 => tag::FLOAT64,
            Self::U8 => tag::UINT8,
            Self::U16 => tag::UINT16,
            Self::U32 => tag::UINT32,
            Self::U64 => tag::UINT64,
            Self::I8 => tag::INT8,
            Self::I16 => tag::INT16,
            Self::I32 => tag::INT32,
            Self::I64 => tag::INT64,
            Self::FixExt1 => tag::FIXEXT1,
            Self::FixExt2 => tag::FIXEXT2,
            Self::FixExt4 => tag::FIXEXT4,
            Self::FixExt8 => tag::FIXEXT8,
            Self::FixExt16 => tag::FIXEXT16,
            Self::Str8 => tag::STR8,
            Self::Str16 => tag::STR16,
            Self::Str32 => tag::STR32,
            Self::Array16 => tag::ARRAY16,
            Self::Array32 => tag::ARRAY32,
            Self::Map16 => tag::MAP16,
            Self::Map32 => tag::MAP32,
            Self::NegativeFixint(v) => (v as u8) | tag::NEGATIVE_FIXINT_MIN,
        }
    }

    /// Number of fixed bytes that must follow the tag before the decoder
    /// can make progress.
    ///
    /// For length-prefixed kinds this is the width of the length field;
    /// for fixext it covers the type byte and the payload together.
    pub fn trail_len(self) -> usize {
        match self {
            Self::PositiveFixint(_)
            | Self::FixMap(_)
            | Self::FixArray(_)
            | Self::FixStr(_)
            | Self::Nil
            | Self::Reserved
            | Self::False
            | Self::True
            | Self::NegativeFixint(_) => 0,
            Self::Bin8 | Self::Ext8 | Self::Str8 | Self::U8 | Self::I8 => 1,
            Self::Bin16
            | Self::Ext16
            | Self::Str16
            | Self::U16
            | Self::I16
            | Self::Array16
            | Self::Map16 => 2,
            Self::Bin32
            | Self::Ext32
            | Self::Str32
            | Self::U32
            | Self::I32
            | Self::F32
            | Self::Array32
            | Self::Map32 => 4,
            Self::F64 | Self::U64 | Self::I64 => 8,
            Self::FixExt1 => 2,
            Self::FixExt2 => 3,
            Self::FixExt4 => 5,
            Self::FixExt8 => 9,
            Self::FixExt16 => 17,
        }
    }

    /// Payload size of a fixext marker, or `None` for every other kind.
    pub fn fixext_len(self) -> Option<usize> {
        match self {
            Self::FixExt1 => Some(1),
            Self::FixExt2 => Some(2),
            Self::FixExt4 => Some(4),
            Self::FixExt8 => Some(8),
            Self::FixExt16 => Some(16),
            _ => None,
        }
    }
}

impl From<u8> for Marker {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_roundtrips() {
        for byte in 0..=u8::MAX {
            assert_eq!(Marker::from_u8(byte).to_u8(), byte, "byte {byte:#04x}");
        }
    }

    #[test]
    fn fixed_ranges_carry_payload() {
        assert_eq!(Marker::from_u8(0x05), Marker::PositiveFixint(5));
        assert_eq!(Marker::from_u8(0x8F), Marker::FixMap(15));
        assert_eq!(Marker::from_u8(0x93), Marker::FixArray(3));
        assert_eq!(Marker::from_u8(0xBF), Marker::FixStr(31));
        assert_eq!(Marker::from_u8(0xFF), Marker::NegativeFixint(-1));
        assert_eq!(Marker::from_u8(0xE0), Marker::NegativeFixint(-32));
    }

    #[test]
    fn reserved_byte() {
        assert_eq!(Marker::from_u8(0xC1), Marker::Reserved);
    }

    #[test]
    fn trail_lengths() {
        assert_eq!(Marker::Str8.trail_len(), 1);
        assert_eq!(Marker::Map16.trail_len(), 2);
        assert_eq!(Marker::U64.trail_len(), 8);
        assert_eq!(Marker::FixExt16.trail_len(), 17);
        assert_eq!(Marker::FixStr(3).trail_len(), 0);
    }

    #[test]
    fn to_u8_masks_out_of_range_payload() {
        assert_eq!(Marker::FixStr(40).to_u8(), 0xA8);
        assert_eq!(Marker::FixArray(0x1F).to_u8(), 0x9F);
    }
}
