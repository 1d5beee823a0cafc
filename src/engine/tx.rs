//! Per-thread transaction context.
//!
//! Contexts appear lazily with default state the first time a thread id is
//! touched and are never destroyed; only the staged sets are reset, at the
//! outermost commit.

use crate::interval::IntervalSet;

#[derive(Debug, Default)]
pub struct ThreadCtx {
    /// Transaction nesting depth; 0 = not in a transaction.
    pub(crate) tx_level: u32,
    /// Ranges explicitly staged via TX_ADD in the current transaction.
    pub(crate) added: IntervalSet,
    /// Ranges written inside the transaction without a prior TX_ADD.
    pub(crate) non_added_writes: IntervalSet,
    /// While > 0 the thread is inside internal library bookkeeping and
    /// detection reports are suppressed.
    pub(crate) internal_level: u32,
    /// Per-thread detection kill switch.
    pub(crate) detection_disabled: bool,
}

impl ThreadCtx {
    pub fn in_tx(&self) -> bool {
        self.tx_level > 0
    }

    pub fn in_internal(&self) -> bool {
        self.internal_level > 0
    }

    /// Clear both staged sets; called when the outermost transaction ends.
    pub(crate) fn clear_staged(&mut self) {
        self.added.clear();
        self.non_added_writes.clear();
    }
}
