#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod handle;
pub mod streaming;
pub mod unpacker;

pub use config::{DecoderConfig, PayloadKind, ReferencePolicy, UnpackLimits};
pub use context::Context;
pub use decoder::{Decoded, decode, decode_bytes, decode_exact};
pub use error::DecodeError;
pub use handle::ObjectHandle;
pub use streaming::StreamingDecoder;
pub use unpacker::Unpacker;
