#![no_main]

use libfuzzer_sys::fuzz_target;
use mpack_decoder::{DecoderConfig, UnpackLimits, decode};
use mpack_zone::Zone;

// Fuzz target: one-shot decoder over arbitrary bytes.
//
// Decodes messages back to back until the input is exhausted or an error
// stops it. Catches bugs in:
// - Tag classification and big-endian field loads
// - Container frame bookkeeping (push, fold, pop)
// - Limit and depth checks
// - Offset arithmetic near the end of the input
fuzz_target!(|data: &[u8]| {
    let limits = UnpackLimits::default().with_array(4096).with_map(4096).with_depth(64);
    let config = DecoderConfig::default().with_limits(limits);
    let zone = Zone::new();
    let mut offset = 0;
    while offset < data.len() {
        match decode(data, &mut offset, &zone, &config) {
            Ok(decoded) => {
                let _ = decoded.value.to_string();
            }
            Err(_) => break,
        }
    }
});
