#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mpack_decoder::{DecoderConfig, decode_exact};
use mpack_encoder::encode;
use mpack_types::Value;
use mpack_zone::{Zone, ZoneError};

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Nil,
    Bool(bool),
    UInt(u64),
    Int(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Ext(i8, Vec<u8>),
    Array(Vec<FuzzValue>),
    Map(Vec<(FuzzValue, FuzzValue)>),
}

fn build<'z>(v: &FuzzValue, zone: &'z Zone) -> Result<Value<'z>, ZoneError> {
    Ok(match v {
        FuzzValue::Nil => Value::Nil,
        FuzzValue::Bool(b) => Value::Boolean(*b),
        FuzzValue::UInt(n) => Value::UInt(*n),
        FuzzValue::Int(n) => Value::from(*n),
        FuzzValue::F32(f) => Value::F32(*f),
        FuzzValue::F64(f) => Value::F64(*f),
        FuzzValue::Str(s) => Value::str_in(zone, s)?,
        FuzzValue::Bin(b) => Value::bin_in(zone, b)?,
        FuzzValue::Ext(t, d) => Value::ext_in(zone, *t, d)?,
        FuzzValue::Array(items) => {
            let items = items.iter().map(|i| build(i, zone)).collect::<Result<Vec<_>, _>>()?;
            Value::array_in(zone, &items)?
        }
        FuzzValue::Map(pairs) => {
            let pairs = pairs
                .iter()
                .map(|(k, v)| Ok((build(k, zone)?, build(v, zone)?)))
                .collect::<Result<Vec<_>, ZoneError>>()?;
            Value::map_in(zone, &pairs)?
        }
    })
}

fn depth(v: &FuzzValue) -> usize {
    match v {
        FuzzValue::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        FuzzValue::Map(pairs) => 1 + pairs.iter().map(|(k, v)| depth(k).max(depth(v))).max().unwrap_or(0),
        _ => 0,
    }
}

// Fuzz target: encode → decode → encode must reproduce the same bytes.
//
// Comparing bytes rather than values keeps NaN payloads in play.
fuzz_target!(|input: FuzzValue| {
    if depth(&input) > 512 {
        return;
    }
    let zone = Zone::new();
    let Ok(value) = build(&input, &zone) else { return };
    let bytes = encode(&value).expect("in-memory encode");

    let out = Zone::new();
    let decoded = decode_exact(&bytes, &out, &DecoderConfig::default()).expect("decode own output");
    assert_eq!(encode(&decoded.value).expect("re-encode"), bytes);
});
