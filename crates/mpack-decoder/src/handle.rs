use std::fmt;

use mpack_types::{FromValue, TypeError, Value};
use mpack_zone::{Zone, ZoneError};

/// A decoded value bundled with the zone that owns it.
///
/// Payloads that reference an input buffer stay valid because the zone
/// holds a share of that buffer as a finalizer. The handle is `Send`, so
/// a message decoded on one task can be processed on another; the value
/// is only reachable through [`get`](Self::get), whose result borrows the
/// handle.
pub struct ObjectHandle {
    value: Value<'static>,
    zone: Zone,
}

/// Erase the lifetime of a value about to be stored next to its zone.
///
/// # Safety
///
/// Everything `value` borrows must live in `zone`'s chunks, in memory the
/// zone keeps alive through a finalizer, or in `'static` data.
pub(crate) unsafe fn extend(value: Value<'_>) -> Value<'static> {
    // SAFETY: lifetimes only; forwarded from the caller.
    unsafe { std::mem::transmute::<Value<'_>, Value<'static>>(value) }
}

impl ObjectHandle {
    /// # Safety
    ///
    /// Same contract as [`extend`].
    pub(crate) unsafe fn from_parts(value: Value<'_>, zone: Zone) -> Self {
        Self {
            // SAFETY: forwarded from the caller.
            value: unsafe { extend(value) },
            zone,
        }
    }

    /// Build a value inside `zone` and keep both together.
    ///
    /// The builder must work for any zone lifetime, so the value cannot
    /// borrow anything shorter-lived than the zone itself.
    ///
    /// # Errors
    ///
    /// Whatever `build` returns.
    pub fn build<E, F>(zone: Zone, build: F) -> Result<Self, E>
    where
        F: for<'z> FnOnce(&'z Zone) -> Result<Value<'z>, E>,
    {
        let value = build(&zone)?;
        // SAFETY: `value` can only borrow from `zone` or `'static` data,
        // and zone chunks do not move when the `Zone` is moved.
        let value = unsafe { extend(value) };
        Ok(Self { value, zone })
    }

    /// A handle for a value with no zone-backed parts.
    pub fn from_static(value: Value<'static>) -> Self {
        Self {
            value,
            zone: Zone::with_chunk_size(0),
        }
    }

    pub fn get(&self) -> Value<'_> {
        self.value
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Convert the held value.
    ///
    /// # Errors
    ///
    /// See [`Value::convert`].
    pub fn convert<'s, T: FromValue<'s>>(&'s self) -> Result<T, TypeError> {
        self.get().convert()
    }

    /// Deep-copy into a new handle whose zone is sized to fit the value in
    /// one chunk. The copy borrows nothing from `self`.
    ///
    /// # Errors
    ///
    /// [`ZoneError`] if the new zone cannot allocate.
    pub fn clone_handle(&self) -> Result<Self, ZoneError> {
        let zone = Zone::with_chunk_size(self.value.zone_size().max(64));
        Self::build(zone, |zone| self.get().deep_copy(zone))
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
