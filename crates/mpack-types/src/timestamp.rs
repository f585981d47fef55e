//! The timestamp extension (ext type -1).
//!
//! ```text
//! ┌────────┬──────────────────────────────────────────────┐
//! │ Length │ Layout (big-endian)                          │
//! ├────────┼──────────────────────────────────────────────┤
//! │ 4      │ u32 seconds                                  │
//! │ 8      │ u30 nanoseconds | u34 seconds (one u64)      │
//! │ 12     │ u32 nanoseconds, i64 seconds                 │
//! └────────┴──────────────────────────────────────────────┘
//! ```

use mpack_zone::{Zone, ZoneError};

use crate::convert::FromValue;
use crate::error::TypeError;
use crate::value::{Ext, Value};

/// Extension type tag reserved for timestamps.
pub const TIMESTAMP_TYPE: i8 = -1;

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
  pub seconds: i64,
  pub nanos: u32,
}

impl Timestamp {
  pub fn new(seconds: i64, nanos: u32) -> Self {
    Self { seconds, nanos }
  }

  /// Parse an ext payload.
  ///
  /// # Errors
  ///
  /// [`TypeError::InvalidTimestamp`] if the payload is not 4, 8 or 12 bytes.
  #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
  pub fn from_payload(data: &[u8]) -> Result<Self, TypeError> {
    match *data {
      [a, b, c, d] => Ok(Self::new(i64::from(u32::from_be_bytes([a, b, c, d])), 0)),
      [a, b, c, d, e, f, g, h] => {
        let raw = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
        Ok(Self::new((raw & 0x0003_FFFF_FFFF) as i64, (raw >> 34) as u32))
      }
      [n0, n1, n2, n3, s0, s1, s2, s3, s4, s5, s6, s7] => Ok(Self::new(
        i64::from_be_bytes([s0, s1, s2, s3, s4, s5, s6, s7]),
        u32::from_be_bytes([n0, n1, n2, n3]),
      )),
      _ => Err(TypeError::InvalidTimestamp { len: data.len() }),
    }
  }

  /// Write the smallest encoding into `buf` and return its length.
  ///
  /// 4 bytes when there are no nanoseconds and seconds fit in a u32,
  /// 8 bytes when seconds fit in 34 bits and nanoseconds in 30, 12 bytes
  /// otherwise.
  #[allow(clippy::cast_sign_loss)]
  pub fn encode_into(&self, buf: &mut [u8; 12]) -> usize {
    if self.seconds >= 0 && self.seconds >> 34 == 0 && self.nanos >> 30 == 0 {
      let secs = self.seconds as u64;
      if self.nanos == 0 && secs <= u64::from(u32::MAX) {
        buf[..4].copy_from_slice(&(secs as u32).to_be_bytes());
        return 4;
      }
      let raw = (u64::from(self.nanos) << 34) | secs;
      buf[..8].copy_from_slice(&raw.to_be_bytes());
      return 8;
    }
    buf[..4].copy_from_slice(&self.nanos.to_be_bytes());
    buf[4..].copy_from_slice(&self.seconds.to_be_bytes());
    12
  }

  /// Encode as an ext value whose payload lives in `zone`.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if the zone cannot allocate.
  pub fn to_value<'a>(&self, zone: &'a Zone) -> Result<Value<'a>, ZoneError> {
    let mut buf = [0u8; 12];
    let len = self.encode_into(&mut buf);
    Value::ext_in(zone, TIMESTAMP_TYPE, &buf[..len])
  }
}

impl FromValue<'_> for Timestamp {
  fn from_value(value: &Value<'_>) -> Result<Self, TypeError> {
    match *value {
      Value::Ext(Ext {
        type_tag: TIMESTAMP_TYPE,
        data,
      }) => Self::from_payload(data),
      ref other => Err(TypeError::Mismatch {
        expected: "timestamp",
        found: other.type_name(),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn encoded(ts: Timestamp) -> Vec<u8> {
    let mut buf = [0u8; 12];
    let len = ts.encode_into(&mut buf);
    buf[..len].to_vec()
  }

  #[test]
  fn picks_smallest_encoding() {
    assert_eq!(encoded(Timestamp::new(1, 0)), vec![0, 0, 0, 1]);
    assert_eq!(encoded(Timestamp::new(1, 1)).len(), 8);
    assert_eq!(encoded(Timestamp::new(1 << 34, 0)).len(), 12);
    assert_eq!(encoded(Timestamp::new(-1, 0)).len(), 12);
  }

  #[test]
  fn nanos_past_thirty_bits_use_wide_form() {
    for ts in [Timestamp::new(1, 1 << 30), Timestamp::new(1, u32::MAX)] {
      let bytes = encoded(ts);
      assert_eq!(bytes.len(), 12);
      assert_eq!(Timestamp::from_payload(&bytes).unwrap(), ts);
    }
    assert_eq!(encoded(Timestamp::new(1, (1 << 30) - 1)).len(), 8);
  }

  #[test]
  fn payload_roundtrip_for_each_width() {
    for ts in [
      Timestamp::new(0, 0),
      Timestamp::new(i64::from(u32::MAX), 0),
      Timestamp::new(1_700_000_000, 999_999_999),
      Timestamp::new((1 << 34) - 1, 5),
      Timestamp::new(-62_135_596_800, 123),
    ] {
      assert_eq!(Timestamp::from_payload(&encoded(ts)).unwrap(), ts);
    }
  }

  #[test]
  fn eight_byte_layout() {
    // nanos = 1 in the top 30 bits, seconds = 2 in the low 34
    let bytes = [0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02];
    assert_eq!(Timestamp::from_payload(&bytes).unwrap(), Timestamp::new(2, 1));
  }

  #[test]
  fn bad_length() {
    assert!(matches!(
      Timestamp::from_payload(&[0; 5]),
      Err(TypeError::InvalidTimestamp { len: 5 })
    ));
  }

  #[test]
  fn converts_from_ext_value() {
    let zone = Zone::new();
    let ts = Timestamp::new(42, 7);
    let value = ts.to_value(&zone).unwrap();
    assert_eq!(value.convert::<Timestamp>().unwrap(), ts);
    assert!(Value::Ext(Ext::new(1, &[0; 4])).convert::<Timestamp>().is_err());
  }

  proptest! {
    #[test]
    fn any_timestamp_survives_its_payload(seconds in any::<i64>(), nanos in any::<u32>()) {
      let ts = Timestamp::new(seconds, nanos);
      prop_assert_eq!(Timestamp::from_payload(&encoded(ts)).unwrap(), ts);
    }
  }
}
