use mpack_wire::WireError;
use mpack_zone::ZoneError;

/// Errors that can occur while decoding.
///
/// Size and depth overflows are raised as soon as a header declares too
/// much, before any payload byte is waited for or any element storage is
/// touched. The message is abandoned; whatever was already built in the
/// zone is garbage and goes away with the zone.
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── Parse               ← reserved tag byte 0xC1
///   ├── InsufficientBytes   ← input ended mid-message (resumable)
///   ├── ArraySizeOverflow   ┐
///   ├── MapSizeOverflow     │
///   ├── StrSizeOverflow     ├ declared size above the configured limit
///   ├── BinSizeOverflow     │
///   ├── ExtSizeOverflow     ┘
///   ├── DepthOverflow       ← nesting deeper than the configured limit
///   ├── TrailingData        ← bytes left after an exact decode
///   ├── Alloc(ZoneError)    ← zone could not allocate
///   ├── Wire(WireError)     ← from mpack-wire field loads
///   └── Io(std::io::Error)  ← from the async reader
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A tag byte that can never start a value.
    #[error("parse error: invalid tag byte {byte:#04X} at offset {offset}")]
    Parse { offset: usize, byte: u8 },

    /// The input ended before a complete value was read.
    ///
    /// `needed` is the minimum number of further bytes before the decoder
    /// can make progress, not the size of the rest of the message.
    #[error("insufficient bytes: need at least {needed} more")]
    InsufficientBytes { needed: usize },

    #[error("array size {declared} exceeds limit {limit}")]
    ArraySizeOverflow { declared: usize, limit: usize },

    #[error("map size {declared} exceeds limit {limit}")]
    MapSizeOverflow { declared: usize, limit: usize },

    #[error("str size {declared} exceeds limit {limit}")]
    StrSizeOverflow { declared: usize, limit: usize },

    #[error("bin size {declared} exceeds limit {limit}")]
    BinSizeOverflow { declared: usize, limit: usize },

    /// `declared` counts the payload plus its type byte.
    #[error("ext size {declared} exceeds limit {limit}")]
    ExtSizeOverflow { declared: usize, limit: usize },

    #[error("nesting depth exceeds limit {limit}")]
    DepthOverflow { limit: usize },

    #[error("unexpected data after value ({extra_bytes} bytes)")]
    TrailingData { extra_bytes: usize },

    #[error("allocation failed: {0}")]
    Alloc(#[from] ZoneError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// True for the five size overflows and the depth overflow.
    pub fn is_size_overflow(&self) -> bool {
        matches!(
            self,
            Self::ArraySizeOverflow { .. }
                | Self::MapSizeOverflow { .. }
                | Self::StrSizeOverflow { .. }
                | Self::BinSizeOverflow { .. }
                | Self::ExtSizeOverflow { .. }
                | Self::DepthOverflow { .. }
        )
    }

    /// True when the bytes themselves are malformed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Wire(_))
    }

    /// True when more input could complete the value.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::InsufficientBytes { .. })
    }
}
