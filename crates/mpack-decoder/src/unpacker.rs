use bytes::BytesMut;
use mpack_zone::{DEFAULT_CHUNK_SIZE, Zone};
use tracing::debug;

use crate::config::DecoderConfig;
use crate::context::Context;
use crate::error::DecodeError;
use crate::handle::ObjectHandle;

/// Default size of the first buffer allocation (64 KiB).
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 64 * 1024;

/// Suggested amount to reserve before each read (32 KiB).
pub const DEFAULT_RESERVE_SIZE: usize = 32 * 1024;

/// Streaming buffer manager: accumulates bytes from any source and hands
/// out one decoded message at a time.
///
/// The caller drives a reserve / fill / consume / next cycle:
///
/// ```text
///   loop {
///       unpacker.reserve_buffer(DEFAULT_RESERVE_SIZE);
///       let n = source.read(unpacker.buffer())?;
///       unpacker.buffer_consumed(n);
///       while let Some(handle) = unpacker.next()? {
///           process(handle.get());
///       }
///   }
/// ```
///
/// Buffer layout:
///
/// ```text
///   0          off              used                 len
///   ├──────────┼────────────────┼────────────────────┤
///   │ parsed   │ not yet parsed │ free (buffer())    │
///   └──────────┴────────────────┴────────────────────┘
/// ```
///
/// Decoded strings, binaries and extensions point straight into the
/// buffer unless the reference policy says otherwise. When a message
/// completes, its bytes are split off the buffer as a shared [`Bytes`]
/// handle; if any payload references them, that handle is stored as a
/// finalizer in the message's zone and the whole zone moves into the
/// returned [`ObjectHandle`]. The same happens when the buffer must grow
/// in the middle of a message. Bytes nothing references are released at
/// once, which lets the next `reserve_buffer` reuse the space in place.
///
/// [`Bytes`]: bytes::Bytes
pub struct Unpacker {
    ctx: Context<'static>,
    zone: Zone,
    /// `[0..len]` is initialized; `[0..used]` holds received bytes.
    buf: BytesMut,
    used: usize,
    off: usize,
    parsed: usize,
    initial_capacity: usize,
}

impl Unpacker {
    pub fn new() -> Self {
        Self::with_capacity_and_config(DEFAULT_INITIAL_BUFFER_SIZE, DecoderConfig::default())
    }

    pub fn with_capacity(initial_buffer_size: usize) -> Self {
        Self::with_capacity_and_config(initial_buffer_size, DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self::with_capacity_and_config(DEFAULT_INITIAL_BUFFER_SIZE, config)
    }

    pub fn with_capacity_and_config(initial_buffer_size: usize, config: DecoderConfig) -> Self {
        let mut buf = BytesMut::with_capacity(initial_buffer_size);
        buf.resize(initial_buffer_size, 0);
        Self {
            ctx: Context::new(config),
            zone: Zone::with_chunk_size(DEFAULT_CHUNK_SIZE),
            buf,
            used: 0,
            off: 0,
            parsed: 0,
            initial_capacity: initial_buffer_size.max(1),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        self.ctx.config()
    }

    // ── Buffer cycle ────────────────────────────────────────────────────

    /// Make sure at least `size` bytes are writable through [`buffer`](Self::buffer).
    pub fn reserve_buffer(&mut self, size: usize) {
        if self.buffer_capacity() >= size {
            return;
        }
        self.expand_buffer(size);
    }

    fn expand_buffer(&mut self, size: usize) {
        if self.off > 0 {
            self.detach_parsed();
        }

        let needed = self.used + size;
        let mut next = self.buf.len().max(self.initial_capacity);
        while next < needed {
            next *= 2;
        }

        self.buf.truncate(self.used);
        // Reclaims the front in place when no parsed bytes are still shared
        self.buf.reserve(next - self.used);
        let capacity = self.buf.capacity();
        self.buf.resize(capacity, 0);
        debug!(
            unparsed = self.used,
            requested = size,
            capacity, "unpacker buffer expanded"
        );
    }

    /// Split the parsed prefix off the buffer, handing it to the zone when
    /// decoded payloads still point into it.
    fn detach_parsed(&mut self) {
        let parsed = self.buf.split_to(self.off).freeze();
        self.used -= self.off;
        self.off = 0;
        if self.ctx.take_referenced() {
            debug!(bytes = parsed.len(), "zone retains referenced buffer");
            self.zone.push_finalizer(move || drop(parsed));
        }
    }

    /// Writable space after the received bytes.
    pub fn buffer(&mut self) -> &mut [u8] {
        let len = self.buf.len() - self.used;
        // SAFETY: `[used..len]` is initialized and lies past every byte a
        // decoded value can point at. Going through the raw pointer keeps
        // `[0..used]` from being reborrowed mutably while the context's
        // frames still hold references into it.
        unsafe { std::slice::from_raw_parts_mut(self.buf.as_mut_ptr().add(self.used), len) }
    }

    /// Bytes currently writable through [`buffer`](Self::buffer).
    pub fn buffer_capacity(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Mark `size` bytes written into [`buffer`](Self::buffer) as received.
    pub fn buffer_consumed(&mut self, size: usize) {
        debug_assert!(size <= self.buffer_capacity());
        self.used = (self.used + size).min(self.buf.len());
    }

    /// Copy `data` in as received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.reserve_buffer(data.len());
        self.buffer()[..data.len()].copy_from_slice(data);
        self.buffer_consumed(data.len());
    }

    // ── Decoding ────────────────────────────────────────────────────────

    /// Decode the next complete message, if the received bytes hold one.
    ///
    /// Returns `Ok(None)` when more input is needed; progress so far is
    /// kept and the call can be repeated after more bytes arrive.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`] from the state machine. The partial message is
    /// discarded and the zone cleared; the offset stays where the error
    /// was found, so the caller decides whether to
    /// [`skip_nonparsed_buffer`](Self::skip_nonparsed_buffer), drop the
    /// rest with [`remove_nonparsed_buffer`](Self::remove_nonparsed_buffer),
    /// or give up.
    pub fn next(&mut self) -> Result<Option<ObjectHandle>, DecodeError> {
        // SAFETY: `[0..used]` is never rewritten while a message is in
        // progress; it is only split off (keeping its address) or, when
        // nothing borrows it, released. The zone reference is used only
        // for this call; values point into its chunks, which stay put
        // when the `Zone` value moves.
        let data: &'static [u8] = unsafe { std::slice::from_raw_parts(self.buf.as_ptr(), self.used) };
        let zone: &'static Zone = unsafe { &*std::ptr::from_ref(&self.zone) };

        let start = self.off;
        let result = self.ctx.execute(data, &mut self.off, zone);
        self.parsed += self.off - start;

        match result {
            Ok(Some(value)) => {
                let zone = self.release_zone();
                self.parsed = 0;
                // SAFETY: `value` borrows the released zone and buffer
                // prefixes that the zone now keeps alive.
                Ok(Some(unsafe { ObjectHandle::from_parts(value, zone) }))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.reset_zone();
                self.parsed = 0;
                Err(err)
            }
        }
    }

    fn release_zone(&mut self) -> Zone {
        self.detach_parsed();
        let chunk_size = self.zone.chunk_size();
        std::mem::replace(&mut self.zone, Zone::with_chunk_size(chunk_size))
    }

    /// Abandon the message in progress. Received but unparsed bytes stay.
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.parsed = 0;
    }

    /// Abandon the message in progress and free everything built for it.
    pub fn reset_zone(&mut self) {
        self.ctx.reset();
        self.zone.clear();
    }

    /// True when a message has been started but not finished.
    pub fn has_partial_message(&self) -> bool {
        !self.ctx.is_idle()
    }

    /// Minimum further bytes the last `Ok(None)` was waiting for.
    pub fn shortfall(&self) -> usize {
        self.ctx.shortfall()
    }

    // ── Accounting ──────────────────────────────────────────────────────

    /// Bytes of the current message consumed so far.
    pub fn parsed_size(&self) -> usize {
        self.parsed
    }

    /// Consumed bytes of the current message plus everything received
    /// after them.
    pub fn message_size(&self) -> usize {
        self.parsed + self.nonparsed_size()
    }

    pub fn nonparsed_buffer(&self) -> &[u8] {
        &self.buf[self.off..self.used]
    }

    pub fn nonparsed_size(&self) -> usize {
        self.used - self.off
    }

    /// Drop up to `size` unparsed bytes from the front. Only meaningful
    /// between messages.
    pub fn skip_nonparsed_buffer(&mut self, size: usize) {
        self.off = (self.off + size).min(self.used);
    }

    /// Drop every unparsed byte.
    pub fn remove_nonparsed_buffer(&mut self) {
        self.used = self.off;
    }
}

impl Default for Unpacker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Unpacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unpacker")
            .field("used", &self.used)
            .field("off", &self.off)
            .field("parsed", &self.parsed)
            .field("capacity", &self.buf.len())
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}
