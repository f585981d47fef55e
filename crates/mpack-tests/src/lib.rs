//! Shared fixtures for the integration tests and benches.
//!
//! [`Tree`] is an owned mirror of [`Value`] that property tests can
//! generate freely and then lay out in a zone; [`event_stream`] produces a
//! realistic stream of concatenated records.

use mpack_encoder::{EncodeError, Packer};
use mpack_types::{Timestamp, Value};
use mpack_zone::{Zone, ZoneError};
use proptest::collection::vec;
use proptest::prelude::*;

/// Owned value tree.
#[derive(Clone, Debug)]
pub enum Tree {
    Nil,
    Bool(bool),
    UInt(u64),
    /// Always negative, matching what the decoder produces.
    Int(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Ext(i8, Vec<u8>),
    Array(Vec<Tree>),
    Map(Vec<(Tree, Tree)>),
}

impl Tree {
    /// Lay the tree out in `zone`.
    ///
    /// # Errors
    ///
    /// [`ZoneError`] if the zone cannot allocate.
    pub fn build<'z>(&self, zone: &'z Zone) -> Result<Value<'z>, ZoneError> {
        match self {
            Tree::Nil => Ok(Value::Nil),
            Tree::Bool(b) => Ok(Value::Boolean(*b)),
            Tree::UInt(n) => Ok(Value::UInt(*n)),
            Tree::Int(n) => Ok(Value::Int(*n)),
            Tree::F32(f) => Ok(Value::F32(*f)),
            Tree::F64(f) => Ok(Value::F64(*f)),
            Tree::Str(s) => Value::str_in(zone, s),
            Tree::Bin(b) => Value::bin_in(zone, b),
            Tree::Ext(t, d) => Value::ext_in(zone, *t, d),
            Tree::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| item.build(zone))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::array_in(zone, &values)
            }
            Tree::Map(pairs) => {
                let values = pairs
                    .iter()
                    .map(|(k, v)| Ok((k.build(zone)?, v.build(zone)?)))
                    .collect::<Result<Vec<_>, ZoneError>>()?;
                Value::map_in(zone, &values)
            }
        }
    }
}

/// Arbitrary trees up to four levels deep. Floats exclude NaN so that
/// decoded values compare equal to the originals.
pub fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Nil),
        any::<bool>().prop_map(Tree::Bool),
        any::<u64>().prop_map(Tree::UInt),
        (i64::MIN..0i64).prop_map(Tree::Int),
        any::<f32>().prop_filter("NaN", |f| !f.is_nan()).prop_map(Tree::F32),
        any::<f64>().prop_filter("NaN", |f| !f.is_nan()).prop_map(Tree::F64),
        ".{0,40}".prop_map(Tree::Str),
        vec(any::<u8>(), 0..300).prop_map(Tree::Bin),
        (any::<i8>(), vec(any::<u8>(), 0..20)).prop_map(|(t, d)| Tree::Ext(t, d)),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..20).prop_map(Tree::Array),
            vec((inner.clone(), inner), 0..6).prop_map(Tree::Map),
        ]
    })
}

/// `count` concatenated event records:
///
/// ```text
/// { "id": i, "name": "event-i", "tags": ["alpha", "beta"],
///   "payload": bin(32), "at": timestamp }
/// ```
///
/// # Errors
///
/// Never in practice; writing to a `Vec` cannot fail.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn event_stream(count: usize) -> Result<Vec<u8>, EncodeError> {
    let mut packer = Packer::new(Vec::with_capacity(count * 96));
    for i in 0..count {
        packer.pack_map_header(5)?;
        packer.pack_str("id")?;
        packer.pack_uint(i as u64)?;
        packer.pack_str("name")?;
        packer.pack_str(&format!("event-{i}"))?;
        packer.pack_str("tags")?;
        packer.pack_array_header(2)?;
        packer.pack_str("alpha")?;
        packer.pack_str("beta")?;
        packer.pack_str("payload")?;
        packer.pack_bin(&[i as u8; 32])?;
        packer.pack_str("at")?;
        packer.pack_timestamp(&Timestamp::new(1_700_000_000 + i as i64, 0))?;
    }
    Ok(packer.into_inner())
}
