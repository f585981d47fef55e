//! Conversion from [`Value`] into host types.

use crate::error::TypeError;
use crate::value::{Ext, Value};

/// Build `Self` from a borrowed [`Value`].
///
/// Borrowing targets such as `&'a str` point straight into the value's
/// backing storage and share its lifetime.
pub trait FromValue<'a>: Sized {
  /// # Errors
  ///
  /// [`TypeError`] when the tag does not fit or the payload is out of range.
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError>;
}

impl<'a> Value<'a> {
  /// Convert into any [`FromValue`] target.
  ///
  /// # Errors
  ///
  /// Propagates the target's [`TypeError`].
  pub fn convert<T: FromValue<'a>>(&self) -> Result<T, TypeError> {
    T::from_value(self)
  }
}

fn mismatch(expected: &'static str, found: &Value<'_>) -> TypeError {
  TypeError::Mismatch {
    expected,
    found: found.type_name(),
  }
}

impl<'a> FromValue<'a> for Value<'a> {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    Ok(*value)
  }
}

impl FromValue<'_> for bool {
  fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
    match *value {
      Value::Boolean(v) => Ok(v),
      ref other => Err(mismatch("boolean", other)),
    }
  }
}

macro_rules! from_value_int {
  ($($t:ty),*) => {$(
    impl FromValue<'_> for $t {
      fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
        let out_of_range = |value: i128| TypeError::OutOfRange {
          target: stringify!($t),
          value,
        };
        match *value {
          Value::UInt(v) => <$t>::try_from(v).map_err(|_| out_of_range(i128::from(v))),
          Value::Int(v) => <$t>::try_from(v).map_err(|_| out_of_range(i128::from(v))),
          ref other => Err(mismatch("integer", other)),
        }
      }
    }
  )*};
}

from_value_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

// Integers widen into floats, and float32/float64 convert into each other.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
impl FromValue<'_> for f32 {
  fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
    match *value {
      Value::F32(v) => Ok(v),
      Value::F64(v) => Ok(v as f32),
      Value::UInt(v) => Ok(v as f32),
      Value::Int(v) => Ok(v as f32),
      ref other => Err(mismatch("float", other)),
    }
  }
}

#[allow(clippy::cast_precision_loss)]
impl FromValue<'_> for f64 {
  fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
    match *value {
      Value::F32(v) => Ok(f64::from(v)),
      Value::F64(v) => Ok(v),
      Value::UInt(v) => Ok(v as f64),
      Value::Int(v) => Ok(v as f64),
      ref other => Err(mismatch("float", other)),
    }
  }
}

impl<'a> FromValue<'a> for &'a str {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    match *value {
      Value::Str(bytes) => Ok(std::str::from_utf8(bytes)?),
      ref other => Err(mismatch("str", other)),
    }
  }
}

impl FromValue<'_> for String {
  fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
    <&str>::from_value(value).map(str::to_owned)
  }
}

/// Accepts both `Bin` and `Str`, since either carries raw bytes.
impl<'a> FromValue<'a> for &'a [u8] {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    match *value {
      Value::Bin(bytes) | Value::Str(bytes) => Ok(bytes),
      ref other => Err(mismatch("bin", other)),
    }
  }
}

impl<'a> FromValue<'a> for Ext<'a> {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    match *value {
      Value::Ext(ext) => Ok(ext),
      ref other => Err(mismatch("ext", other)),
    }
  }
}

impl<'a, T: FromValue<'a>> FromValue<'a> for Option<T> {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    match value {
      Value::Nil => Ok(None),
      other => T::from_value(other).map(Some),
    }
  }
}

impl<'a, T: FromValue<'a>> FromValue<'a> for Vec<T> {
  fn from_value(value: &Value<'a>) -> Result<Self, TypeError> {
    match *value {
      Value::Array(items) => items.iter().map(T::from_value).collect(),
      ref other => Err(mismatch("array", other)),
    }
  }
}
