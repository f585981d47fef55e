#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mpack_decoder::{DecoderConfig, UnpackLimits, Unpacker, decode};
use mpack_encoder::encode;
use mpack_zone::Zone;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    cuts: Vec<u16>,
    initial_capacity: u8,
}

// Fuzz target: the streaming buffer manager must yield the same messages
// as a one-shot decode, wherever the input is split. Messages are compared
// by their re-encoding, which is exact for ext tags and NaN payloads.
fuzz_target!(|input: FuzzInput| {
    let limits = UnpackLimits::default().with_array(4096).with_map(4096).with_depth(64);
    let config = DecoderConfig::default().with_limits(limits);

    let zone = Zone::new();
    let mut expected = Vec::new();
    let mut offset = 0;
    while offset < input.bytes.len() {
        match decode(&input.bytes, &mut offset, &zone, &config) {
            Ok(decoded) => expected.push(encode(&decoded.value).unwrap()),
            Err(_) => break,
        }
    }

    let mut points: Vec<usize> = input
        .cuts
        .iter()
        .map(|&c| usize::from(c) % (input.bytes.len() + 1))
        .collect();
    points.push(0);
    points.push(input.bytes.len());
    points.sort_unstable();
    points.dedup();

    let mut unpacker = Unpacker::with_capacity_and_config(usize::from(input.initial_capacity), config);
    let mut got = Vec::new();
    'feed: for pair in points.windows(2) {
        unpacker.feed(&input.bytes[pair[0]..pair[1]]);
        loop {
            match unpacker.next() {
                Ok(Some(handle)) => got.push(encode(&handle.get()).unwrap()),
                Ok(None) => break,
                Err(_) => break 'feed,
            }
        }
    }

    assert!(got.len() <= expected.len());
    assert_eq!(got[..], expected[..got.len()]);
});
