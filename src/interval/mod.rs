//! Interval map and set over byte address ranges.
//!
//! The range-state, timestamp and write-attribution maps all share this one
//! abstraction. Spans are half-open, non-overlapping, and adjacent spans of
//! equal value are coalesced after every mutation.

pub mod map;
pub mod set;

pub use map::IntervalMap;
pub use set::IntervalSet;
