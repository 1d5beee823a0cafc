//! Interval set: membership-only view over [`IntervalMap`].

use crate::interval::IntervalMap;
use crate::state::AddressRange;

/// Set of byte ranges with coalescing insert and overlap lookup. Backs the
/// transaction staging sets and the commit-variable set.
#[derive(Clone, Debug, Default)]
pub struct IntervalSet {
    inner: IntervalMap<()>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: AddressRange) {
        self.inner.insert(range, ());
    }

    pub fn remove(&mut self, range: AddressRange) {
        self.inner.remove(range);
    }

    /// True iff any member intersects `range`.
    pub fn contains_overlap(&self, range: AddressRange) -> bool {
        self.inner.overlaps(range)
    }

    /// True iff every byte of `range` is a member.
    pub fn covers(&self, range: AddressRange) -> bool {
        self.inner.covers(range)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = AddressRange> + '_ {
        self.inner.iter().map(|(range, ())| range)
    }
}
