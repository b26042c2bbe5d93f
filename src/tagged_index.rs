//! The Tagged Index: a worker index and an ABA-defeating tag packed into one
//! machine word, so the Idle Stack's top pointer can be mutated with a
//! single-word CAS instead of a double-width one.

use std::sync::atomic::{AtomicU32, Ordering};

/// Bits given to the index field. 16 is enough for every roster size this
/// crate targets (a process with `2^16` worker threads is not a realistic
/// deployment), leaving the remaining 16 bits for the tag.
pub const IDX_BITS: u32 = 16;

/// Mask selecting the low `IDX_BITS` bits: the index field.
pub const IDX_MASK: u32 = (1 << IDX_BITS) - 1;

/// One tag increment, positioned just above the index field.
pub const TAG_UNIT: u32 = 1 << IDX_BITS;

/// Sentinel index meaning "no worker here" / "stack empty".
pub const NONE: u32 = IDX_MASK;

/// A worker index plus an ABA tag, packed into a `u32`.
///
/// Equality compares the raw word, so two `TaggedIndex` values with the same
/// `target()` but different tags are unequal: exactly the property the Idle
/// Stack's CAS loop relies on to detect a stale `old` value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaggedIndex(u32);

impl TaggedIndex {
    /// Empty stack, tag zero. Used to initialize a fresh `AtomicTaggedIndex`.
    pub const NONE: TaggedIndex = TaggedIndex(NONE);

    pub fn from_raw(raw: u32) -> TaggedIndex {
        TaggedIndex(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// The index field, with the tag masked off. `NONE` if the stack is empty.
    pub fn target(self) -> u32 {
        self.0 & IDX_MASK
    }

    pub fn is_none(self) -> bool {
        self.target() == NONE
    }

    /// Build the tagged index that should replace `expected` once `target`
    /// becomes the new top: the old tag bits are kept, and one `TAG_UNIT` is
    /// added in the same step that the index field changes to `target`.
    ///
    /// `target` never sets any bit above `IDX_MASK`, so `target | TAG_UNIT`
    /// never carries into the tag's own bits; the `+` only ever advances the
    /// tag by exactly one unit.
    pub fn make(expected: TaggedIndex, target: u32) -> TaggedIndex {
        debug_assert!(target <= IDX_MASK, "worker index does not fit in IDX_BITS");
        let tag_bits = expected.0 & !IDX_MASK;
        TaggedIndex(tag_bits.wrapping_add(target | TAG_UNIT))
    }
}

/// A padded atomic `TaggedIndex`. Used both as the Idle Stack's `top_idle`
/// and, conceptually, as the shape every atomic top-of-stack word in this
/// crate takes.
pub struct AtomicTaggedIndex(AtomicU32);

impl AtomicTaggedIndex {
    pub fn new(initial: TaggedIndex) -> AtomicTaggedIndex {
        AtomicTaggedIndex(AtomicU32::new(initial.raw()))
    }

    /// The specification's "relaxed load": no ordering is needed to merely
    /// observe the stack, only the subsequent CAS (or a slot mutex) needs to
    /// establish happens-before.
    pub fn load_relaxed(&self) -> TaggedIndex {
        TaggedIndex::from_raw(self.0.load(Ordering::Relaxed))
    }

    pub fn compare_exchange(
        &self,
        current: TaggedIndex,
        new: TaggedIndex,
    ) -> Result<TaggedIndex, TaggedIndex> {
        self.0
            .compare_exchange_weak(current.raw(), new.raw(), Ordering::AcqRel, Ordering::Relaxed)
            .map(TaggedIndex::from_raw)
            .map_err(TaggedIndex::from_raw)
    }
}
