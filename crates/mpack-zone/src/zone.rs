//! The zone: a bump-pointer arena that owns decoded data and runs every
//! registered finalizer in one batch when it is cleared or dropped.
//!
//! ```text
//! ┌──────────────────────── Zone ────────────────────────┐
//! │ bump        chunk list, grows by doubling            │
//! │ finalizers  [f0, f1, f2, ...]  run f_n .. f0 on clear│
//! │ chunk_size  initial chunk capacity (default 8 KiB)   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Addresses handed out by a zone stay valid until `clear()` or drop; new
//! chunks are linked in rather than moving old ones. Allocation methods
//! take `&self`, so many values can be built into one zone while earlier
//! ones are still borrowed.

use std::alloc::Layout;
use std::cell::RefCell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use bumpalo::Bump;
use tracing::trace;

use crate::error::ZoneError;

/// Initial chunk capacity used by [`Zone::new`].
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// One registered cleanup action.
enum Finalizer {
    /// Drop a value of an erased type in place.
    Drop {
        func: unsafe fn(*mut u8),
        data: *mut u8,
    },
    /// Arbitrary owned cleanup, typically releasing a shared input buffer.
    Callback(Box<dyn FnOnce() + Send>),
}

// SAFETY: `Drop` entries are only created by `Zone::allocate_with`, which
// bounds `T: Send`, and the pointee lives in the zone's own chunks.
unsafe impl Send for Finalizer {}

impl Finalizer {
    fn run(self) {
        match self {
            // SAFETY: `data` was written with a live `T` matching `func`
            // and each finalizer is popped before it runs, so it runs once.
            Self::Drop { func, data } => unsafe { func(data) },
            Self::Callback(callback) => callback(),
        }
    }
}

unsafe fn drop_erased<T>(data: *mut u8) {
    // SAFETY: forwarded from `Finalizer::run`.
    unsafe { std::ptr::drop_in_place(data.cast::<T>()) }
}

/// Removes a just-registered finalizer if the constructor unwinds.
struct Unregister<'z> {
    zone: &'z Zone,
    index: usize,
}

impl Drop for Unregister<'_> {
    fn drop(&mut self) {
        let mut finalizers = self.zone.finalizers.borrow_mut();
        if self.index < finalizers.len() {
            // Anything the constructor registered after us is complete and
            // stays; only our own slot is withdrawn.
            drop(finalizers.remove(self.index));
        }
    }
}

/// Bump-pointer memory pool with a LIFO finalizer list.
///
/// The zone is `Send` but not `Sync`: one thread builds into it at a time,
/// and ownership of the whole zone (plus everything inside it) can be
/// handed to another thread.
pub struct Zone {
    bump: Bump,
    finalizers: RefCell<Vec<Finalizer>>,
    chunk_size: usize,
}

impl Zone {
    /// Create a zone with the default 8 KiB initial chunk.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a zone whose first chunk holds `chunk_size` bytes.
    ///
    /// Later chunks are at least double the previous one, or the size of
    /// the request that overflowed, whichever is larger.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            bump: Bump::with_capacity(chunk_size),
            finalizers: RefCell::new(Vec::new()),
            chunk_size,
        }
    }

    /// The initial chunk size this zone was configured with.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes currently held in chunks, including unused tail space.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Number of finalizers waiting for `clear()` or drop.
    pub fn finalizer_count(&self) -> usize {
        self.finalizers.borrow().len()
    }

    /// Cap the total chunk memory this zone may hold. `None` removes the cap.
    ///
    /// Once the cap is reached, any request that needs a new chunk fails
    /// with [`ZoneError::AllocationFailure`].
    pub fn set_allocation_limit(&mut self, limit: Option<usize>) {
        self.bump.set_allocation_limit(limit);
    }

    fn alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, ZoneError> {
        self.bump
            .try_alloc_layout(layout)
            .map_err(|_| ZoneError::AllocationFailure {
                size: layout.size(),
                align: layout.align(),
            })
    }

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidLayout`] if `align` is not a power of two.
    /// - [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    pub fn allocate_aligned(&self, size: usize, align: usize) -> Result<NonNull<u8>, ZoneError> {
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| ZoneError::InvalidLayout { size, align })?;
        self.alloc_layout(layout)
    }

    /// Allocate `size` bytes with no alignment guarantee, for raw payloads.
    ///
    /// # Errors
    ///
    /// [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    pub fn allocate_no_align(&self, size: usize) -> Result<NonNull<u8>, ZoneError> {
        self.allocate_aligned(size, 1)
    }

    /// Move `value` into the zone. Its destructor runs on `clear()` or drop.
    ///
    /// # Errors
    ///
    /// [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate<T: Send + 'static>(&self, value: T) -> Result<&mut T, ZoneError> {
        self.allocate_with(|| value)
    }

    /// Reserve space for a `T`, register its destructor, then build it with
    /// `init`.
    ///
    /// The finalizer is registered before `init` runs. If `init` panics the
    /// registration is withdrawn during unwinding, so the zone never holds a
    /// finalizer for an object that was never constructed.
    ///
    /// # Errors
    ///
    /// [`ZoneError::AllocationFailure`] if no chunk could be obtained;
    /// `init` is not called in that case.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_with<T, F>(&self, init: F) -> Result<&mut T, ZoneError>
    where
        T: Send + 'static,
        F: FnOnce() -> T,
    {
        let slot = self.alloc_layout(Layout::new::<T>())?.cast::<T>();

        if std::mem::needs_drop::<T>() {
            let index = {
                let mut finalizers = self.finalizers.borrow_mut();
                finalizers.push(Finalizer::Drop {
                    func: drop_erased::<T>,
                    data: slot.as_ptr().cast(),
                });
                finalizers.len() - 1
            };
            let guard = Unregister { zone: self, index };
            let value = init();
            std::mem::forget(guard);
            // SAFETY: `slot` is fresh, aligned for `T` and exclusively ours.
            unsafe { slot.as_ptr().write(value) };
        } else {
            let value = init();
            // SAFETY: as above.
            unsafe { slot.as_ptr().write(value) };
        }

        // SAFETY: initialized above; the chunk outlives `&self`.
        Ok(unsafe { &mut *slot.as_ptr() })
    }

    /// Copy `bytes` into the zone.
    ///
    /// # Errors
    ///
    /// [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<&mut [u8], ZoneError> {
        self.alloc_slice_copy(bytes)
    }

    /// Copy a slice of plain values into the zone. No finalizer is needed
    /// because `Copy` types have no destructor.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidLayout`] if the slice size overflows `isize`.
    /// - [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], ZoneError> {
        let dst = self.alloc_uninit_slice::<T>(src.len())?;
        for (slot, item) in dst.iter_mut().zip(src) {
            slot.write(*item);
        }
        // SAFETY: every slot was written in the loop above.
        Ok(unsafe { &mut *(std::ptr::from_mut::<[MaybeUninit<T>]>(dst) as *mut [T]) })
    }

    /// Reserve room for `len` values without initializing it.
    ///
    /// The memory is never touched here, so a huge declared length costs
    /// address space only until the caller starts filling it.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidLayout`] if `len * size_of::<T>()` overflows.
    /// - [`ZoneError::AllocationFailure`] if no chunk could be obtained.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_uninit_slice<T>(&self, len: usize) -> Result<&mut [MaybeUninit<T>], ZoneError> {
        let layout = Layout::array::<T>(len).map_err(|_| ZoneError::InvalidLayout {
            size: len.saturating_mul(size_of::<T>()),
            align: align_of::<T>(),
        })?;
        let ptr = self.alloc_layout(layout)?;
        // SAFETY: the layout covers exactly `len` elements of `T`, and
        // `MaybeUninit` has no validity requirement.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr().cast(), len) })
    }

    /// Register a cleanup callback. It runs exactly once, on the next
    /// `clear()` or when the zone is dropped.
    pub fn push_finalizer<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.finalizers
            .borrow_mut()
            .push(Finalizer::Callback(Box::new(callback)));
    }

    /// Run every finalizer newest-first, then release all chunks but one.
    pub fn clear(&mut self) {
        let ran = self.run_finalizers();
        self.bump.reset();
        trace!(finalizers = ran, retained = self.bump.allocated_bytes(), "zone cleared");
    }

    /// Exchange the full contents of two zones in O(1).
    pub fn swap(&mut self, other: &mut Zone) {
        std::mem::swap(self, other);
    }

    fn run_finalizers(&mut self) -> usize {
        let mut ran = 0;
        while let Some(finalizer) = self.finalizers.get_mut().pop() {
            finalizer.run();
            ran += 1;
        }
        ran
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Zone {
    fn drop(&mut self) {
        self.run_finalizers();
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("chunk_size", &self.chunk_size)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("finalizers", &self.finalizer_count())
            .finish()
    }
}
