//! JSON-like stringification.
//!
//! Strings are escaped the way a JSON emitter would (including `\/`), bin
//! payloads are printed as quoted raw text, and extensions print as the
//! bare word `EXT`. The output is for diagnostics and is not guaranteed
//! to parse as JSON.

use std::fmt::{self, Display, Formatter, Write};

use crate::value::Value;

impl Display for Value<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match *self {
      Value::Nil => f.write_str("null"),
      Value::Boolean(v) => write!(f, "{v}"),
      Value::UInt(v) => write!(f, "{v}"),
      Value::Int(v) => write!(f, "{v}"),
      Value::F32(v) => write!(f, "{v}"),
      Value::F64(v) => write!(f, "{v}"),
      Value::Str(bytes) => write_escaped(f, bytes),
      Value::Bin(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
      Value::Ext(_) => f.write_str("EXT"),
      Value::Array(items) => {
        f.write_char('[')?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_char(',')?;
          }
          Display::fmt(item, f)?;
        }
        f.write_char(']')
      }
      Value::Map(pairs) => {
        f.write_char('{')?;
        for (i, (key, val)) in pairs.iter().enumerate() {
          if i > 0 {
            f.write_char(',')?;
          }
          write!(f, "{key}:{val}")?;
        }
        f.write_char('}')
      }
    }
  }
}

fn write_escaped(f: &mut Formatter<'_>, bytes: &[u8]) -> fmt::Result {
  f.write_char('"')?;
  for chunk in bytes.utf8_chunks() {
    for c in chunk.valid().chars() {
      match c {
        '\\' => f.write_str("\\\\")?,
        '"' => f.write_str("\\\"")?,
        '/' => f.write_str("\\/")?,
        '\u{08}' => f.write_str("\\b")?,
        '\u{0C}' => f.write_str("\\f")?,
        '\n' => f.write_str("\\n")?,
        '\r' => f.write_str("\\r")?,
        '\t' => f.write_str("\\t")?,
        c if c < '\u{20}' || c == '\u{7F}' => write!(f, "\\u{:04x}", u32::from(c))?,
        c => f.write_char(c)?,
      }
    }
    if !chunk.invalid().is_empty() {
      f.write_char(char::REPLACEMENT_CHARACTER)?;
    }
  }
  f.write_char('"')
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::Ext;

  #[test]
  fn scalars() {
    assert_eq!(Value::Nil.to_string(), "null");
    assert_eq!(Value::Boolean(true).to_string(), "true");
    assert_eq!(Value::UInt(42).to_string(), "42");
    assert_eq!(Value::Int(-7).to_string(), "-7");
    assert_eq!(Value::F64(1.5).to_string(), "1.5");
    assert_eq!(Value::F32(-0.25).to_string(), "-0.25");
  }

  #[test]
  fn string_escapes() {
    let v = Value::Str(b"a\"b\\c/d\n\t\x01\x7f");
    insta::assert_snapshot!(v.to_string(), @r#""a\"b\\c\/d\n\t\u0001\u007f""#);
  }

  #[test]
  fn invalid_utf8_is_replaced() {
    let v = Value::Str(&[b'o', b'k', 0xFF]);
    assert_eq!(v.to_string(), "\"ok\u{FFFD}\"");
  }

  #[test]
  fn bin_and_ext() {
    assert_eq!(Value::Bin(b"raw/bytes").to_string(), "\"raw/bytes\"");
    assert_eq!(Value::Ext(Ext::new(1, &[0, 1])).to_string(), "EXT");
  }

  #[test]
  fn nested_containers() {
    let inner = [Value::UInt(1), Value::Nil, Value::Str(b"x")];
    let pairs = [
      (Value::Str(b"list"), Value::Array(&inner)),
      (Value::UInt(2), Value::Map(&[])),
    ];
    insta::assert_snapshot!(Value::Map(&pairs).to_string(), @r#"{"list":[1,null,"x"],2:{}}"#);
    assert_eq!(Value::Array(&[]).to_string(), "[]");
  }
}
