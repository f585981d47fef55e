//! Encode → decode round trips.
//!
//! Every width boundary of the wire format is exercised on both sides:
//! the encoder must pick the smallest header, and the decoder must rebuild
//! an equal value from it.
//!
//! ```text
//!   integers     fixint │ 8 │ 16 │ 32 │ 64 bit
//!   str          fixstr (<32) │ str8 │ str16 │ str32
//!   bin / ext    8 │ 16 │ 32 bit lengths, fixext 1/2/4/8/16
//!   array / map  fix (<16) │ 16 │ 32 bit counts
//! ```

use mpack_decoder::{DecoderConfig, decode_exact};
use mpack_encoder::encode;
use mpack_tests::{Tree, arb_tree};
use mpack_types::{Ext, Timestamp, Value};
use mpack_zone::Zone;
use proptest::prelude::*;

/// Encode, decode, compare; returns the wire bytes.
fn roundtrip(value: &Value<'_>) -> Vec<u8> {
    let bytes = encode(value).unwrap();
    let zone = Zone::new();
    let decoded = decode_exact(&bytes, &zone, &DecoderConfig::default())
        .unwrap_or_else(|e| panic!("decode of {} failed: {e}", hex::encode(&bytes[..bytes.len().min(16)])));
    assert_eq!(decoded.value, *value);
    bytes
}

fn prefix(bytes: &[u8], n: usize) -> String {
    hex::encode(&bytes[..n])
}

// ── Integers ──────────────────────────────────────────────────────────────────

#[test]
fn unsigned_width_boundaries() {
    let cases: &[(u64, &str)] = &[
        (0, "00"),
        (127, "7f"),
        (128, "cc80"),
        (255, "ccff"),
        (256, "cd0100"),
        (65_535, "cdffff"),
        (65_536, "ce00010000"),
        (u64::from(u32::MAX), "ceffffffff"),
        (u64::from(u32::MAX) + 1, "cf0000000100000000"),
        (u64::MAX, "cfffffffffffffffff"),
    ];
    for &(n, wire) in cases {
        assert_eq!(hex::encode(roundtrip(&Value::UInt(n))), wire, "uint {n}");
    }
}

#[test]
fn signed_width_boundaries() {
    let cases: &[(i64, &str)] = &[
        (-1, "ff"),
        (-32, "e0"),
        (-33, "d0df"),
        (-128, "d080"),
        (-129, "d1ff7f"),
        (-32_768, "d18000"),
        (-32_769, "d2ffff7fff"),
        (i64::from(i32::MIN), "d280000000"),
        (i64::from(i32::MIN) - 1, "d3ffffffff7fffffff"),
        (i64::MIN, "d38000000000000000"),
    ];
    for &(n, wire) in cases {
        assert_eq!(hex::encode(roundtrip(&Value::Int(n))), wire, "int {n}");
    }
}

#[test]
fn non_negative_signed_input_packs_as_unsigned() {
    let value = Value::from(300i64);
    assert_eq!(value, Value::UInt(300));
    assert_eq!(hex::encode(roundtrip(&value)), "cd012c");
}

// ── Floats and booleans ───────────────────────────────────────────────────────

#[test]
fn floats_keep_their_width() {
    assert_eq!(hex::encode(roundtrip(&Value::F32(1.5))), "ca3fc00000");
    assert_eq!(hex::encode(roundtrip(&Value::F64(-0.5))), "cbbfe0000000000000");
    roundtrip(&Value::F64(f64::INFINITY));
    roundtrip(&Value::F32(f32::MIN_POSITIVE));
}

#[test]
fn nil_and_booleans() {
    assert_eq!(hex::encode(roundtrip(&Value::Nil)), "c0");
    assert_eq!(hex::encode(roundtrip(&Value::Boolean(false))), "c2");
    assert_eq!(hex::encode(roundtrip(&Value::Boolean(true))), "c3");
}

// ── Payloads ──────────────────────────────────────────────────────────────────

#[test]
fn str_length_boundaries() {
    let cases: &[(usize, &str)] = &[
        (0, "a0"),
        (31, "bf"),
        (32, "d920"),
        (255, "d9ff"),
        (256, "da0100"),
        (65_535, "daffff"),
        (65_536, "db00010000"),
    ];
    for &(len, header) in cases {
        let text = "x".repeat(len);
        let bytes = roundtrip(&Value::from(text.as_str()));
        assert_eq!(prefix(&bytes, header.len() / 2), header, "str of {len}");
        assert_eq!(bytes.len(), header.len() / 2 + len);
    }
}

#[test]
fn bin_length_boundaries() {
    let cases: &[(usize, &str)] = &[
        (0, "c400"),
        (255, "c4ff"),
        (256, "c50100"),
        (65_535, "c5ffff"),
        (65_536, "c600010000"),
    ];
    for &(len, header) in cases {
        let data = vec![0xA5u8; len];
        let bytes = roundtrip(&Value::Bin(&data));
        assert_eq!(prefix(&bytes, header.len() / 2), header, "bin of {len}");
    }
}

#[test]
fn ext_length_boundaries() {
    let cases: &[(usize, &str)] = &[
        (0, "c70009"),
        (1, "d409"),
        (2, "d509"),
        (3, "c70309"),
        (4, "d609"),
        (8, "d709"),
        (16, "d809"),
        (17, "c71109"),
        (256, "c8010009"),
        (65_536, "c90001000009"),
    ];
    for &(len, header) in cases {
        let data = vec![0x42u8; len];
        let bytes = roundtrip(&Value::Ext(Ext::new(9, &data)));
        assert_eq!(prefix(&bytes, header.len() / 2), header, "ext of {len}");
    }
}

#[test]
fn negative_ext_type_survives() {
    let bytes = roundtrip(&Value::Ext(Ext::new(-128, b"zz")));
    assert_eq!(hex::encode(bytes), "d5807a7a");
}

// ── Containers ────────────────────────────────────────────────────────────────

#[test]
fn array_count_boundaries() {
    let cases: &[(usize, &str)] = &[
        (0, "90"),
        (15, "9f"),
        (16, "dc0010"),
        (65_535, "dcffff"),
        (65_536, "dd00010000"),
    ];
    for &(count, header) in cases {
        let items = vec![Value::Nil; count];
        let bytes = roundtrip(&Value::Array(&items));
        assert_eq!(prefix(&bytes, header.len() / 2), header, "array of {count}");
    }
}

#[test]
fn map_count_boundaries() {
    let cases: &[(usize, &str)] = &[
        (0, "80"),
        (15, "8f"),
        (16, "de0010"),
        (65_535, "deffff"),
        (65_536, "df00010000"),
    ];
    for &(count, header) in cases {
        let pairs: Vec<_> = (0..count as u64).map(|i| (Value::UInt(i), Value::Nil)).collect();
        let bytes = roundtrip(&Value::Map(&pairs));
        assert_eq!(prefix(&bytes, header.len() / 2), header, "map of {count}");
    }
}

#[test]
fn nested_empty_containers() {
    let empties = [Value::Array(&[]), Value::Map(&[])];
    let outer = [Value::Array(&empties)];
    assert_eq!(hex::encode(roundtrip(&Value::Array(&outer))), "91929080");
}

#[test]
fn map_preserves_duplicate_keys_in_order() {
    let pairs = [
        (Value::from("k"), Value::UInt(1)),
        (Value::from("k"), Value::UInt(2)),
    ];
    let zone = Zone::new();
    let bytes = encode(&Value::Map(&pairs)).unwrap();
    let decoded = decode_exact(&bytes, &zone, &DecoderConfig::default()).unwrap().value;
    assert_eq!(decoded.as_map().unwrap().len(), 2);
    assert_eq!(decoded.get(&Value::from("k")), Some(&Value::UInt(1)));
}

// ── Timestamps ────────────────────────────────────────────────────────────────

#[test]
fn timestamp_forms() {
    let cases: &[(Timestamp, &str)] = &[
        (Timestamp::new(1, 0), "d6ff"),
        (Timestamp::new(1, 500), "d7ff"),
        (Timestamp::new(1 << 33, 0), "d7ff"),
        (Timestamp::new(1 << 34, 0), "c70cff"),
        (Timestamp::new(-1, 999_999_999), "c70cff"),
    ];
    for &(ts, header) in cases {
        let mut packer = mpack_encoder::Packer::new(Vec::new());
        packer.pack_timestamp(&ts).unwrap();
        let bytes = packer.into_inner();
        assert_eq!(prefix(&bytes, header.len() / 2), header, "{ts:?}");

        let zone = Zone::new();
        let value = decode_exact(&bytes, &zone, &DecoderConfig::default()).unwrap().value;
        assert_eq!(value.convert::<Timestamp>().unwrap(), ts);
    }
}

// ── Property round trip ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn arbitrary_values_roundtrip(tree in arb_tree()) {
        let zone = Zone::new();
        let value = tree.build(&zone).unwrap();
        let bytes = encode(&value).unwrap();

        let out = Zone::new();
        let decoded = decode_exact(&bytes, &out, &DecoderConfig::default()).unwrap();
        prop_assert_eq!(decoded.value, value);

        // Deep copy into a third zone still compares equal and re-encodes identically
        let copy_zone = Zone::new();
        let copy = decoded.value.deep_copy(&copy_zone).unwrap();
        prop_assert_eq!(encode(&copy).unwrap(), bytes);
    }

    #[test]
    fn deep_copy_into_presized_zone(tree in arb_tree()) {
        let zone = Zone::new();
        let value = tree.build(&zone).unwrap();
        let target = Zone::with_chunk_size(value.zone_size().max(64));
        let copy = value.deep_copy(&target).unwrap();
        prop_assert_eq!(copy, value);
    }
}

#[test]
fn tree_build_is_usable_outside_proptest() {
    let tree = Tree::Map(vec![(Tree::Str("a".into()), Tree::Array(vec![Tree::Int(-5), Tree::Nil]))]);
    let zone = Zone::new();
    let value = tree.build(&zone).unwrap();
    assert_eq!(value.to_string(), r#"{"a":[-5,null]}"#);
    roundtrip(&value);
}
