/// Errors raised while classifying or loading raw wire bytes.
///
/// These are the lowest-level failures in the stack. The decoder wraps
/// them into its own `DecodeError` so callers never have to match on two
/// error types for one parse.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Input ended before a fixed-width field could be read.
    #[error("unexpected end of input at offset {offset}: need {needed} more bytes")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A width outside 1, 2, 4 or 8 was requested from a loader.
    #[error("unsupported integer width {width}")]
    UnsupportedWidth { width: usize },
}
