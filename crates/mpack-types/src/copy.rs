//! Zone-to-zone deep copy.
//!
//! A decoded value borrows from its zone and possibly from the input
//! buffer. `deep_copy` rebuilds the whole tree inside another zone so the
//! copy depends on nothing but that zone.

use std::mem::MaybeUninit;

use mpack_zone::{Zone, ZoneError};

use crate::value::{Ext, Value};

impl<'a> Value<'a> {
  /// Copy this value, every payload and every container, into `zone`.
  ///
  /// The result shares no memory with `self`: clearing or dropping the
  /// source zone (or input buffer) leaves the copy intact. Containers are
  /// walked with a heap stack, so nesting depth does not consume thread
  /// stack.
  ///
  /// # Errors
  ///
  /// [`ZoneError`] if `zone` cannot allocate. Anything copied before the
  /// failure stays in `zone` until it is cleared.
  pub fn deep_copy<'b>(&self, zone: &'b Zone) -> Result<Value<'b>, ZoneError> {
    let mut stack: Vec<Frame<'a, 'b>> = Vec::new();
    let mut next = *self;
    loop {
      let mut copied = loop {
        match next {
          Value::Array(items) if !items.is_empty() => {
            let slots = zone.alloc_uninit_slice(items.len())?;
            stack.push(Frame::Array { source: items, slots, filled: 0 });
            next = items[0];
          }
          Value::Map(pairs) if !pairs.is_empty() => {
            let slots = zone.alloc_uninit_slice(pairs.len())?;
            stack.push(Frame::Map { source: pairs, slots, filled: 0, key: None });
            next = pairs[0].0;
          }
          leaf => break copy_leaf(leaf, zone)?,
        }
      };
      next = loop {
        let Some(mut frame) = stack.pop() else {
          return Ok(copied);
        };
        match frame.push(copied) {
          Some(source) => {
            stack.push(frame);
            break source;
          }
          None => copied = frame.finish(),
        }
      };
    }
  }

  /// Bytes a zone needs to hold a deep copy of this value, with container
  /// storage rounded up to its alignment.
  ///
  /// Used to size a fresh zone so a copy fits in one chunk.
  pub fn zone_size(&self) -> usize {
    let mut total = 0;
    let mut pending = vec![*self];
    while let Some(value) = pending.pop() {
      match value {
        Value::Str(bytes) | Value::Bin(bytes) => total += bytes.len(),
        Value::Ext(ext) => total += ext.data.len(),
        Value::Array(items) => {
          total += aligned::<Value<'_>>(items.len());
          pending.extend_from_slice(items);
        }
        Value::Map(pairs) => {
          total += aligned::<(Value<'_>, Value<'_>)>(pairs.len());
          pending.extend(pairs.iter().flat_map(|&(k, v)| [k, v]));
        }
        _ => {}
      }
    }
    total
  }
}

/// A container whose copy is partly written. `source` is the original
/// element slice and `filled` counts the slots already written.
enum Frame<'a, 'b> {
  Array {
    source: &'a [Value<'a>],
    slots: &'b mut [MaybeUninit<Value<'b>>],
    filled: usize,
  },
  Map {
    source: &'a [(Value<'a>, Value<'a>)],
    slots: &'b mut [MaybeUninit<(Value<'b>, Value<'b>)>],
    filled: usize,
    key: Option<Value<'b>>,
  },
}

impl<'a, 'b> Frame<'a, 'b> {
  /// Place a copied element and return the next source element to copy,
  /// or `None` once every slot is written.
  fn push(&mut self, value: Value<'b>) -> Option<Value<'a>> {
    match self {
      Frame::Array { source, slots, filled } => {
        slots[*filled].write(value);
        *filled += 1;
        source.get(*filled).copied()
      }
      Frame::Map { source, slots, filled, key } => match key.take() {
        None => {
          *key = Some(value);
          Some(source[*filled].1)
        }
        Some(k) => {
          slots[*filled].write((k, value));
          *filled += 1;
          source.get(*filled).map(|&(k, _)| k)
        }
      },
    }
  }

  fn finish(self) -> Value<'b> {
    match self {
      // SAFETY: `push` returned `None`, so every slot was written.
      Frame::Array { slots, .. } => Value::Array(unsafe { assume_init(slots) }),
      // SAFETY: as above.
      Frame::Map { slots, .. } => Value::Map(unsafe { assume_init(slots) }),
    }
  }
}

/// Copy a scalar or byte payload. Empty containers carry no storage and
/// come back as they are.
fn copy_leaf<'b>(value: Value<'_>, zone: &'b Zone) -> Result<Value<'b>, ZoneError> {
  Ok(match value {
    Value::Nil => Value::Nil,
    Value::Boolean(v) => Value::Boolean(v),
    Value::UInt(v) => Value::UInt(v),
    Value::Int(v) => Value::Int(v),
    Value::F32(v) => Value::F32(v),
    Value::F64(v) => Value::F64(v),
    Value::Str(bytes) => Value::Str(zone.alloc_bytes(bytes)?),
    Value::Bin(bytes) => Value::Bin(zone.alloc_bytes(bytes)?),
    Value::Ext(ext) => Value::Ext(Ext::new(ext.type_tag, zone.alloc_bytes(ext.data)?)),
    Value::Array(_) => Value::Array(&[]),
    Value::Map(_) => Value::Map(&[]),
  })
}

fn aligned<T>(count: usize) -> usize {
  let align = align_of::<T>();
  (size_of::<T>() * count + align - 1) & !(align - 1)
}

/// # Safety
///
/// Every element of `slots` must be initialized.
unsafe fn assume_init<T>(slots: &mut [MaybeUninit<T>]) -> &[T] {
  // SAFETY: `MaybeUninit<T>` has the same layout as `T`.
  unsafe { &*(std::ptr::from_mut::<[MaybeUninit<T>]>(slots) as *const [T]) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(zone: &Zone) -> Value<'_> {
    let inner = Value::array_in(zone, &[Value::UInt(1), Value::Str(b"two")]).unwrap();
    let ext = Value::ext_in(zone, 3, &[9, 9]).unwrap();
    Value::map_in(zone, &[(Value::str_in(zone, "k").unwrap(), inner), (ext, Value::Nil)]).unwrap()
  }

  #[test]
  fn copy_survives_source_clear() {
    let mut source = Zone::new();
    let target = Zone::new();
    let copy = {
      let original = sample(&source);
      let copy = original.deep_copy(&target).unwrap();
      assert_eq!(copy, original);
      copy
    };
    source.clear();
    drop(source);

    let pairs = copy.as_map().unwrap();
    assert_eq!(pairs[0].0, Value::Str(b"k"));
    assert_eq!(pairs[0].1.as_array().unwrap()[1], Value::Str(b"two"));
    assert_eq!(pairs[1].0, Value::Ext(Ext::new(3, &[9, 9])));
  }

  #[test]
  fn copy_does_not_alias_source_bytes() {
    let source = Zone::new();
    let target = Zone::new();
    let original = Value::str_in(&source, "abc").unwrap();
    let copy = original.deep_copy(&target).unwrap();
    let (Value::Str(a), Value::Str(b)) = (original, copy) else {
      panic!("expected strings");
    };
    assert_ne!(a.as_ptr(), b.as_ptr());
  }

  #[test]
  fn copy_of_empty_containers() {
    let zone = Zone::new();
    assert_eq!(Value::Array(&[]).deep_copy(&zone).unwrap(), Value::Array(&[]));
    assert_eq!(Value::Map(&[]).deep_copy(&zone).unwrap(), Value::Map(&[]));
    assert_eq!(Value::Str(b"").deep_copy(&zone).unwrap(), Value::Str(b""));
  }

  #[test]
  fn zone_size_counts_payloads_and_slots() {
    assert_eq!(Value::UInt(7).zone_size(), 0);
    assert_eq!(Value::Str(b"hello").zone_size(), 5);
    let items = [Value::Bin(b"abc"), Value::Nil];
    let expected = 2 * size_of::<Value<'_>>() + 3;
    assert_eq!(Value::Array(&items).zone_size(), expected);
  }

  #[test]
  fn sized_zone_holds_copy_without_growth() {
    let source = Zone::new();
    let original = sample(&source);
    let target = Zone::with_chunk_size(original.zone_size() + 64);
    let before = target.allocated_bytes();
    original.deep_copy(&target).unwrap();
    assert_eq!(target.allocated_bytes(), before);
  }

  #[test]
  fn deep_nesting_copies_on_a_small_stack() {
    const DEPTH: usize = 50_000;
    let walked = std::thread::Builder::new()
      .stack_size(2 * 1024 * 1024)
      .spawn(|| {
        let source = Zone::new();
        let mut value = Value::Str(b"leaf");
        for _ in 0..DEPTH {
          value = Value::array_in(&source, &[value]).unwrap();
        }
        let target = Zone::with_chunk_size(value.zone_size());
        let copy = value.deep_copy(&target).unwrap();

        let mut depth = 0;
        let mut cursor = copy;
        while let Value::Array(&[inner]) = cursor {
          depth += 1;
          cursor = inner;
        }
        (depth, cursor == Value::Str(b"leaf"))
      })
      .unwrap()
      .join()
      .unwrap();
    assert_eq!(walked, (DEPTH, true));
  }
}
