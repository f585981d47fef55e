//! Decoder configuration: size ceilings and the zero-copy policy.

/// Per-category ceilings checked while decoding.
///
/// Sizes are compared against the count or length a header declares, so
/// an oversized message is rejected before its body is read. A value at
/// exactly the limit is accepted.
///
/// ```text
/// ┌────────┬──────────────────────────────────┬──────────────┐
/// │ Field  │ Measures                         │ Default      │
/// ├────────┼──────────────────────────────────┼──────────────┤
/// │ array  │ element count                    │ u32::MAX     │
/// │ map    │ key/value pair count             │ u32::MAX     │
/// │ str    │ payload bytes                    │ u32::MAX     │
/// │ bin    │ payload bytes                    │ u32::MAX     │
/// │ ext    │ payload bytes + 1 type byte      │ u32::MAX     │
/// │ depth  │ open non-empty containers        │ 1024         │
/// └────────┴──────────────────────────────────┴──────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnpackLimits {
    pub array: usize,
    pub map: usize,
    pub str: usize,
    pub bin: usize,
    pub ext: usize,
    pub depth: usize,
}

/// Default nesting ceiling.
pub const DEFAULT_DEPTH_LIMIT: usize = 1024;

const WIRE_MAX: usize = u32::MAX as usize;

impl Default for UnpackLimits {
    fn default() -> Self {
        Self {
            array: WIRE_MAX,
            map: WIRE_MAX,
            str: WIRE_MAX,
            bin: WIRE_MAX,
            ext: WIRE_MAX,
            depth: DEFAULT_DEPTH_LIMIT,
        }
    }
}

impl UnpackLimits {
    pub fn new(array: usize, map: usize, str: usize, bin: usize, ext: usize, depth: usize) -> Self {
        Self {
            array,
            map,
            str,
            bin,
            ext,
            depth,
        }
    }

    #[must_use]
    pub fn with_array(mut self, limit: usize) -> Self {
        self.array = limit;
        self
    }

    #[must_use]
    pub fn with_map(mut self, limit: usize) -> Self {
        self.map = limit;
        self
    }

    #[must_use]
    pub fn with_str(mut self, limit: usize) -> Self {
        self.str = limit;
        self
    }

    #[must_use]
    pub fn with_bin(mut self, limit: usize) -> Self {
        self.bin = limit;
        self
    }

    #[must_use]
    pub fn with_ext(mut self, limit: usize) -> Self {
        self.ext = limit;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, limit: usize) -> Self {
        self.depth = limit;
        self
    }
}

/// Which kind of payload a reference decision is being made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Str,
    Bin,
    Ext,
}

/// Whether a `Str`/`Bin`/`Ext` payload borrows the input buffer or is
/// copied into the zone.
///
/// Referencing is cheaper but ties every produced value to the input
/// buffer. Copying makes the zone self-sufficient. `Custom` receives the
/// payload kind and its length (for ext, including the type byte).
#[derive(Clone, Copy, Debug, Default)]
pub enum ReferencePolicy {
    #[default]
    Always,
    Never,
    Custom(fn(PayloadKind, usize) -> bool),
}

impl ReferencePolicy {
    pub fn should_reference(&self, kind: PayloadKind, len: usize) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Custom(decide) => decide(kind, len),
        }
    }
}

/// Everything a decode run needs to know besides the bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecoderConfig {
    pub limits: UnpackLimits,
    pub reference: ReferencePolicy,
}

impl DecoderConfig {
    #[must_use]
    pub fn with_limits(mut self, limits: UnpackLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: ReferencePolicy) -> Self {
        self.reference = reference;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_full_wire_range() {
        let limits = UnpackLimits::default();
        assert_eq!(limits.array, u32::MAX as usize);
        assert_eq!(limits.ext, u32::MAX as usize);
        assert_eq!(limits.depth, DEFAULT_DEPTH_LIMIT);
    }

    #[test]
    fn builders_set_one_field() {
        let limits = UnpackLimits::default().with_str(10).with_depth(2);
        assert_eq!(limits.str, 10);
        assert_eq!(limits.depth, 2);
        assert_eq!(limits.bin, u32::MAX as usize);
        assert_eq!(UnpackLimits::new(1, 2, 3, 4, 5, 6).ext, 5);
    }

    #[test]
    fn custom_reference_policy() {
        let policy = ReferencePolicy::Custom(|kind, len| kind == PayloadKind::Bin && len > 4);
        assert!(policy.should_reference(PayloadKind::Bin, 5));
        assert!(!policy.should_reference(PayloadKind::Bin, 4));
        assert!(!policy.should_reference(PayloadKind::Str, 100));
        assert!(ReferencePolicy::default().should_reference(PayloadKind::Str, 0));
        assert!(!ReferencePolicy::Never.should_reference(PayloadKind::Ext, 9));
    }
}
