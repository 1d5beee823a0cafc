//! Commit-variable tracking.
//!
//! The commit variable is the designated durability flag of the subject
//! program. The tracker remembers which ranges play that role and the
//! logical time of the most recent update to any of them.

use crate::interval::IntervalSet;
use crate::state::{AddressRange, Timestamp};

#[derive(Debug, Default)]
pub struct CommitTracker {
    vars: IntervalSet,
    /// `None` until the first update; a never-updated commit variable is
    /// conservatively stale because no durability has been asserted yet.
    commit_time: Option<Timestamp>,
}

impl CommitTracker {
    /// Designate `range` as (part of) the commit variable. Additive and
    /// idempotent.
    pub fn register(&mut self, range: AddressRange) {
        self.vars.insert(range);
    }

    pub fn is_commit_var(&self, range: AddressRange) -> bool {
        self.vars.contains_overlap(range)
    }

    pub fn note_update(&mut self, now: Timestamp) {
        self.commit_time = Some(now);
    }

    pub fn commit_time(&self) -> Option<Timestamp> {
        self.commit_time
    }

    pub fn vars(&self) -> &IntervalSet {
        &self.vars
    }

    /// Staleness of the commit flag relative to the newest modification of
    /// the data it certifies. True when the flag was never updated, when the
    /// data carries no recorded modification, or when the flag advanced
    /// strictly past the data's newest modify time.
    pub fn is_stale(&self, max_modify: Option<Timestamp>) -> bool {
        match (self.commit_time, max_modify) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(commit), Some(max)) => commit > max,
        }
    }
}
