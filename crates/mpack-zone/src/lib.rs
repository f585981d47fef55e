#![warn(clippy::pedantic)]

pub mod error;
pub mod zone;

pub use error::ZoneError;
pub use zone::{DEFAULT_CHUNK_SIZE, Zone};
