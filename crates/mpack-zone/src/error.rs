/// Errors from zone allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneError {
    /// The bump allocator could not obtain another chunk, either because
    /// the system allocator refused or the configured ceiling was reached.
    #[error("zone allocation of {size} bytes (align {align}) failed")]
    AllocationFailure { size: usize, align: usize },

    /// The requested size/alignment pair does not form a valid layout
    /// (alignment not a power of two, or size overflows when rounded).
    #[error("invalid allocation layout: size {size}, align {align}")]
    InvalidLayout { size: usize, align: usize },
}
