//! Conformance tests: hand-written wire fixtures decoded and stringified,
//! compared against inline insta snapshots.
//!
//! Each fixture pins one aspect of the text form: escaping, tag rendering,
//! container layout, and the treatment of invalid UTF-8. A snapshot diff
//! means either an intentional format change (accept with
//! `cargo insta review`) or a regression.

use insta::assert_snapshot;
use mpack_decoder::{DecoderConfig, Unpacker, decode_exact};
use mpack_zone::Zone;

fn render(wire: &str) -> String {
    let bytes = hex::decode(wire).unwrap();
    let zone = Zone::new();
    decode_exact(&bytes, &zone, &DecoderConfig::default())
        .unwrap()
        .value
        .to_string()
}

#[test]
fn simple_map() {
    assert_snapshot!(render("81a46e616d65a56d7061636b"), @r#"{"name":"mpack"}"#);
}

#[test]
fn string_escapes() {
    // a / b " c \ LF TAB 0x01 0x7f
    assert_snapshot!(render("aa612f6222635c0a09017f"), @r#""a\/b\"c\\\n\t\u0001\u007f""#);
}

#[test]
fn every_tag_in_one_array() {
    let wire = concat!(
        "9a",                 // array of 10
        "c0c3c2",             // nil true false
        "ff",                 // -1
        "cb3ff8000000000000", // 1.5
        "a178",               // "x"
        "c4026869",           // bin "hi"
        "d40100",             // fixext1 type 1
        "9080",               // [] {}
    );
    assert_snapshot!(render(wire), @r#"[null,true,false,-1,1.5,"x","hi",EXT,[],{}]"#);
}

#[test]
fn non_string_map_keys() {
    assert_snapshot!(render("810192028103c0"), @"{1:[2,{3:null}]}");
}

#[test]
fn float_forms() {
    assert_snapshot!(render("ca3dcccccd"), @"0.1");
    assert_snapshot!(render("cb8000000000000000"), @"-0");
}

#[test]
fn invalid_utf8_is_replaced() {
    assert_snapshot!(render("a361ff62"), @r#""a�b""#);
}

#[test]
fn timestamp_prints_as_ext() {
    assert_snapshot!(render("d6ff00000001"), @"EXT");
}

#[test]
fn stream_of_messages() {
    let bytes = hex::decode("01a361626392c0c3d0e0").unwrap();
    let mut unpacker = Unpacker::new();
    unpacker.feed(&bytes);
    let mut lines = Vec::new();
    while let Some(handle) = unpacker.next().unwrap() {
        lines.push(format!("{}: {handle}", handle.get().type_name()));
    }
    assert_snapshot!(lines.join("\n"), @r#"
    positive integer: 1
    str: "abc"
    array: [null,true]
    negative integer: -32
    "#);
}
