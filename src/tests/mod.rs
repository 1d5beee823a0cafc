pub mod commit_tests;
pub mod interval_tests;

use crate::config::DEFAULT_PM_BASE;
use crate::state::AddressRange;

/// Range at `offset` into the default PM arena window.
pub fn pm(offset: u64, size: u64) -> AddressRange {
    AddressRange::new(DEFAULT_PM_BASE + offset, size).unwrap()
}
