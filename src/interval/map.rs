//! Coalescing interval map keyed by byte address.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use crate::state::AddressRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span<V> {
    end: u64,
    value: V,
}

/// Map from half-open byte ranges to values of uniform state.
///
/// Invariants, maintained by every mutation:
/// - spans never overlap
/// - every span is non-empty (`start < end`)
/// - no two adjacent spans carry equal values
#[derive(Clone, Debug)]
pub struct IntervalMap<V> {
    inner: BTreeMap<u64, Span<V>>,
}

impl<V> Default for IntervalMap<V> {
    fn default() -> Self {
        Self { inner: BTreeMap::new() }
    }
}

impl<V: Copy + Eq> IntervalMap<V> {
    pub fn new() -> Self {
        Self { inner: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Total number of mapped bytes.
    pub fn len_bytes(&self) -> u64 {
        self.inner.iter().map(|(start, span)| span.end - start).sum()
    }

    /// Overwrite `range` with `value`, splitting partially covered spans.
    pub fn insert(&mut self, range: AddressRange, value: V) {
        let (start, end) = (range.start, range.end());
        self.carve(start, end);
        self.inner.insert(start, Span { end, value });
        self.coalesce_around(start);
    }

    /// Unmap `range`, splitting partially covered spans at the edges.
    pub fn remove(&mut self, range: AddressRange) {
        self.carve(range.start, range.end());
    }

    /// True iff any mapped byte intersects `range`.
    pub fn overlaps(&self, range: AddressRange) -> bool {
        match self.inner.range(..range.end()).next_back() {
            Some((_, span)) => span.end > range.start,
            None => false,
        }
    }

    /// True iff every byte of `range` is mapped.
    pub fn covers(&self, range: AddressRange) -> bool {
        let mut cursor = range.start;
        for (sub, _) in self.lookup(range) {
            if sub.start > cursor {
                return false;
            }
            cursor = sub.end();
        }
        cursor >= range.end()
    }

    /// Mapped sub-ranges of `range`, clipped to it, in address order.
    pub fn lookup(&self, range: AddressRange) -> Vec<(AddressRange, V)> {
        let (start, end) = (range.start, range.end());
        // A span beginning before `start` may still reach into the range.
        let from = match self.inner.range(..=start).next_back() {
            Some((&key, span)) if span.end > start => key,
            _ => start,
        };
        let mut out = Vec::new();
        for (&key, span) in self.inner.range(from..end) {
            if span.end <= start {
                continue;
            }
            let clip_start = key.max(start);
            let clip_end = span.end.min(end);
            if clip_start < clip_end {
                out.push((
                    AddressRange { start: clip_start, size: clip_end - clip_start },
                    span.value,
                ));
            }
        }
        out
    }

    /// Value at a single byte, if mapped.
    pub fn get(&self, addr: u64) -> Option<V> {
        match self.inner.range(..=addr).next_back() {
            Some((_, span)) if span.end > addr => Some(span.value),
            _ => None,
        }
    }

    /// Rewrite every span holding `old` to `new`; returns the number of
    /// bytes transitioned.
    pub fn replace_all(&mut self, old: V, new: V) -> u64 {
        let mut moved = 0;
        for (start, span) in self.inner.iter_mut() {
            if span.value == old {
                span.value = new;
                moved += span.end - start;
            }
        }
        if moved > 0 {
            self.normalize();
        }
        moved
    }

    /// All spans in address order.
    pub fn iter(&self) -> impl Iterator<Item = (AddressRange, V)> + '_ {
        self.inner
            .iter()
            .map(|(&start, span)| (AddressRange { start, size: span.end - start }, span.value))
    }

    /// Split spans crossing `start` or `end`, then drop everything inside
    /// `[start, end)`.
    fn carve(&mut self, start: u64, end: u64) {
        if let Some((&key, &span)) = self.inner.range(..start).next_back() {
            if span.end > start {
                self.inner.get_mut(&key).unwrap().end = start;
                self.inner.insert(start, Span { end: span.end, value: span.value });
            }
        }
        if let Some((&key, &span)) = self.inner.range(..end).next_back() {
            if key < end && span.end > end {
                self.inner.get_mut(&key).unwrap().end = end;
                self.inner.insert(end, Span { end: span.end, value: span.value });
            }
        }
        let doomed: Vec<u64> = self.inner.range(start..end).map(|(&key, _)| key).collect();
        for key in doomed {
            self.inner.remove(&key);
        }
    }

    /// Merge the span at `key` with equal-valued touching neighbors.
    fn coalesce_around(&mut self, key: u64) {
        let mut key = key;
        let Span { end, value } = self.inner[&key];

        if let Some((&prev_key, &prev)) = self.inner.range(..key).next_back() {
            if prev.end == key && prev.value == value {
                self.inner.remove(&key);
                self.inner.get_mut(&prev_key).unwrap().end = end;
                key = prev_key;
            }
        }
        let end = self.inner[&key].end;
        if let Some((&next_key, &next)) = self.inner.range((Excluded(key), Unbounded)).next() {
            if next_key == end && next.value == value {
                self.inner.remove(&next_key);
                self.inner.get_mut(&key).unwrap().end = next.end;
            }
        }
    }

    /// One full merge pass; used after bulk rewrites.
    fn normalize(&mut self) {
        let keys: Vec<u64> = self.inner.keys().copied().collect();
        let mut iter = keys.into_iter();
        let Some(mut cur) = iter.next() else { return };
        for key in iter {
            let cur_span = self.inner[&cur];
            let next_span = self.inner[&key];
            if cur_span.end == key && cur_span.value == next_span.value {
                self.inner.remove(&key);
                self.inner.get_mut(&cur).unwrap().end = next_span.end;
            } else {
                cur = key;
            }
        }
    }
}
