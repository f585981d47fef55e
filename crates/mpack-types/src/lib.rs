#![warn(clippy::pedantic)]

pub mod convert;
pub mod copy;
pub mod display;
pub mod error;
pub mod timestamp;
pub mod value;

pub use convert::FromValue;
pub use error::TypeError;
pub use timestamp::Timestamp;
pub use value::{Ext, Value};
