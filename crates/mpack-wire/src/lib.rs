#![warn(clippy::pedantic)]

pub mod endian;
pub mod error;
pub mod marker;

pub use error::WireError;
pub use marker::Marker;
