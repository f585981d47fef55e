use mpack_zone::{Zone, ZoneError};

/// One decoded (or about-to-be-encoded) item.
///
/// `Value` is a plain `Copy` handle: scalars are stored inline, and every
/// payload or container is a slice borrowed for `'a`. That lifetime is
/// whatever keeps the bytes alive, either the [`Zone`] the decoder built
/// into or the input buffer a zero-copy payload points at. The borrow
/// checker therefore rejects any use of a value after its backing storage
/// is gone; to outlive it, [`deep_copy`](Value::deep_copy) into another zone.
///
/// ```text
/// ┌───────────┬────────────────────┬──────────────────────────────┐
/// │ Variant   │ Payload            │ Wire tags                    │
/// ├───────────┼────────────────────┼──────────────────────────────┤
/// │ Nil       │ -                  │ 0xC0                         │
/// │ Boolean   │ bool               │ 0xC2, 0xC3                   │
/// │ UInt      │ u64                │ fixint, 0xCC-0xCF, int >= 0  │
/// │ Int       │ i64 (negative)     │ neg fixint, 0xD0-0xD3        │
/// │ F32 / F64 │ f32 / f64          │ 0xCA / 0xCB                  │
/// │ Str       │ &[u8]              │ fixstr, 0xD9-0xDB            │
/// │ Bin       │ &[u8]              │ 0xC4-0xC6                    │
/// │ Ext       │ Ext { i8, &[u8] }  │ fixext, 0xC7-0xC9            │
/// │ Array     │ &[Value]           │ fixarray, 0xDC, 0xDD         │
/// │ Map       │ &[(Value, Value)]  │ fixmap, 0xDE, 0xDF           │
/// └───────────┴────────────────────┴──────────────────────────────┘
/// ```
///
/// Equality is structural and tag-first: `F32(1.0) != F64(1.0)`,
/// `Int(5) != UInt(5)`, map pairs compare in order, and `NaN` is never
/// equal to itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Value<'a> {
  #[default]
  Nil,
  Boolean(bool),
  /// Any non-negative integer, whatever width or signedness it had on
  /// the wire.
  UInt(u64),
  /// A negative integer.
  Int(i64),
  F32(f32),
  F64(f64),
  /// Raw string bytes. UTF-8 is not enforced at this layer.
  Str(&'a [u8]),
  Bin(&'a [u8]),
  Ext(Ext<'a>),
  Array(&'a [Value<'a>]),
  /// Key/value pairs in wire order. Duplicate keys are kept.
  Map(&'a [(Value<'a>, Value<'a>)]),
}

/// An application-defined extension payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ext<'a> {
  /// Application type tag. Negative tags are reserved; -1 is the
  /// timestamp extension.
  pub type_tag: i8,
  pub data: &'a [u8],
}

impl<'a> Ext<'a> {
  pub fn new(type_tag: i8, data: &'a [u8]) -> Self {
    Self { type_tag, data }
  }
}

impl<'a> Value<'a> {
  /// Human-readable tag name, used in conversion errors.
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Nil => "nil",
      Self::Boolean(_) => "boolean",
      Self::UInt(_) => "positive integer",
      Self::Int(_) => "negative integer",
      Self::F32(_) => "float32",
      Self::F64(_) => "float64",
      Self::Str(_) => "str",
      Self::Bin(_) => "bin",
      Self::Ext(_) => "ext",
      Self::Array(_) => "array",
      Self::Map(_) => "map",
    }
  }

  pub fn is_nil(&self) -> bool {
    matches!(self, Self::Nil)
  }

  pub fn as_array(&self) -> Option<&'a [Value<'a>]> {
    match *self {
      Self::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&'a [(Value<'a>, Value<'a>)]> {
    match *self {
      Self::Map(pairs) => Some(pairs),
      _ => None,
    }
  }

  /// Payload bytes of a `Str`, `Bin` or `Ext`.
  pub fn as_payload(&self) -> Option<&'a [u8]> {
    match *self {
      Self::Str(bytes) | Self::Bin(bytes) => Some(bytes),
      Self::Ext(ext) => Some(ext.data),
      _ => None,
    }
  }

  /// Look up the first pair whose key equals `key`. Linear in the map size.
  pub fn get(&self, key: &Value<'_>) -> Option<&'a Value<'a>> {
    self
      .as_map()?
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v)
  }

  // ── Zone-backed builders ────────────────────────────────────────────

  /// Copy `text` into `zone` and wrap it as a `Str`.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn str_in(zone: &'a Zone, text: &str) -> Result<Self, ZoneError> {
    Ok(Self::Str(zone.alloc_bytes(text.as_bytes())?))
  }

  /// Copy `bytes` into `zone` and wrap them as a `Bin`.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn bin_in(zone: &'a Zone, bytes: &[u8]) -> Result<Self, ZoneError> {
    Ok(Self::Bin(zone.alloc_bytes(bytes)?))
  }

  /// Copy `data` into `zone` and wrap it as an `Ext` with `type_tag`.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn ext_in(zone: &'a Zone, type_tag: i8, data: &[u8]) -> Result<Self, ZoneError> {
    Ok(Self::Ext(Ext::new(type_tag, zone.alloc_bytes(data)?)))
  }

  /// Store `items` contiguously in `zone` as an `Array`.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn array_in(zone: &'a Zone, items: &[Value<'a>]) -> Result<Self, ZoneError> {
    Ok(Self::Array(zone.alloc_slice_copy(items)?))
  }

  /// Store `pairs` contiguously in `zone` as a `Map`, keeping their order.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn map_in(zone: &'a Zone, pairs: &[(Value<'a>, Value<'a>)]) -> Result<Self, ZoneError> {
    Ok(Self::Map(zone.alloc_slice_copy(pairs)?))
  }
}

// ── Scalar conversions ──────────────────────────────────────────────────

impl From<bool> for Value<'_> {
  fn from(v: bool) -> Self {
    Self::Boolean(v)
  }
}

macro_rules! from_unsigned {
  ($($t:ty),*) => {$(
    impl From<$t> for Value<'_> {
      #[allow(clippy::cast_lossless)]
      fn from(v: $t) -> Self {
        Self::UInt(v as u64)
      }
    }
  )*};
}

macro_rules! from_signed {
  ($($t:ty),*) => {$(
    impl From<$t> for Value<'_> {
      #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
      fn from(v: $t) -> Self {
        if v >= 0 {
          Self::UInt(v as u64)
        } else {
          Self::Int(v as i64)
        }
      }
    }
  )*};
}

from_unsigned!(u8, u16, u32, u64, usize);
from_signed!(i8, i16, i32, i64, isize);

impl From<f32> for Value<'_> {
  fn from(v: f32) -> Self {
    Self::F32(v)
  }
}

impl From<f64> for Value<'_> {
  fn from(v: f64) -> Self {
    Self::F64(v)
  }
}

impl<'a> From<&'a str> for Value<'a> {
  fn from(v: &'a str) -> Self {
    Self::Str(v.as_bytes())
  }
}

impl<'a> From<&'a [u8]> for Value<'a> {
  fn from(v: &'a [u8]) -> Self {
    Self::Bin(v)
  }
}

impl<'a> From<Ext<'a>> for Value<'a> {
  fn from(v: Ext<'a>) -> Self {
    Self::Ext(v)
  }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
  fn from(v: Option<T>) -> Self {
    v.map_or(Self::Nil, Into::into)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signed_non_negative_becomes_uint() {
    assert_eq!(Value::from(5i32), Value::UInt(5));
    assert_eq!(Value::from(0i64), Value::UInt(0));
    assert_eq!(Value::from(-1i8), Value::Int(-1));
    assert_eq!(Value::from(i64::MIN), Value::Int(i64::MIN));
  }

  #[test]
  fn equality_is_tag_first() {
    assert_ne!(Value::F32(1.0), Value::F64(1.0));
    assert_ne!(Value::Int(5), Value::UInt(5));
    assert_ne!(Value::Str(b"a"), Value::Bin(b"a"));
    assert_ne!(Value::F64(f64::NAN), Value::F64(f64::NAN));
    assert_eq!(Value::F64(0.5), Value::F64(0.5));
  }

  #[test]
  fn map_equality_is_order_dependent() {
    let a = [(Value::UInt(1), Value::Nil), (Value::UInt(2), Value::Nil)];
    let b = [(Value::UInt(2), Value::Nil), (Value::UInt(1), Value::Nil)];
    assert_ne!(Value::Map(&a), Value::Map(&b));
    assert_eq!(Value::Map(&a), Value::Map(&a.clone()));
  }

  #[test]
  fn builders_copy_into_zone() {
    let zone = Zone::new();
    let text = String::from("hello");
    let s = Value::str_in(&zone, &text).unwrap();
    drop(text);
    assert_eq!(s, Value::Str(b"hello"));

    let bin = Value::bin_in(&zone, &[1, 2, 3]).unwrap();
    let ext = Value::ext_in(&zone, 7, b"xy").unwrap();
    let arr = Value::array_in(&zone, &[s, bin, ext]).unwrap();
    let map = Value::map_in(&zone, &[(s, arr)]).unwrap();

    assert_eq!(arr.as_array().unwrap().len(), 3);
    assert_eq!(map.get(&Value::Str(b"hello")), Some(&arr));
    assert_eq!(ext, Value::Ext(Ext::new(7, b"xy")));
  }

  #[test]
  fn get_returns_first_duplicate() {
    let pairs = [
      (Value::UInt(1), Value::Boolean(true)),
      (Value::UInt(1), Value::Boolean(false)),
    ];
    let map = Value::Map(&pairs);
    assert_eq!(map.get(&Value::UInt(1)), Some(&Value::Boolean(true)));
    assert_eq!(map.get(&Value::UInt(9)), None);
    assert_eq!(Value::Nil.get(&Value::UInt(1)), None);
  }

  #[test]
  fn option_maps_none_to_nil() {
    assert_eq!(Value::from(None::<u8>), Value::Nil);
    assert_eq!(Value::from(Some(3u8)), Value::UInt(3));
  }
}
