use mpack_zone::ZoneError;

/// Errors raised when a [`Value`](crate::Value) is converted into a host
/// type or used to build one of the extension adaptors.
///
/// A `TypeError` never corrupts the value or its zone; the caller can
/// retry with a different target type.
///
/// # Error hierarchy
///
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                               │
/// │   ├── Mismatch        tag differs from target        │
/// │   ├── OutOfRange      integer does not fit target    │
/// │   ├── InvalidUtf8     str payload is not UTF-8       │
/// │   ├── InvalidTimestamp ext -1 with a bad length      │
/// │   └── wraps ZoneError when building into a zone      │
/// └──────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
  /// The value's tag cannot produce the requested type.
  #[error("type mismatch: expected {expected}, found {found}")]
  Mismatch {
    expected: &'static str,
    found: &'static str,
  },

  /// An integer value is outside the target type's range.
  #[error("integer {value} out of range for {target}")]
  OutOfRange { target: &'static str, value: i128 },

  /// A `Str` payload was requested as text but is not valid UTF-8.
  #[error("string payload is not valid UTF-8: {0}")]
  InvalidUtf8(#[from] std::str::Utf8Error),

  /// A timestamp extension whose payload is not 4, 8 or 12 bytes.
  #[error("invalid timestamp payload length {len}")]
  InvalidTimestamp { len: usize },

  #[error(transparent)]
  Zone(#[from] ZoneError),
}
