/// Errors that can occur while packing values.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── LengthOverflow  ← payload or container larger than a u32 header allows
///   └── Io(std::io::Error) ← from the underlying writer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{kind} length {len} exceeds the 32-bit wire limit")]
    LengthOverflow { kind: &'static str, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
