//! Address ranges and per-byte persistence states.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Raw PM address. Traces carry virtual addresses of the subject program.
pub type Addr = u64;

/// Logical modification timestamp (see [`crate::ShadowEngine::advance_time`]).
pub type Timestamp = u64;

/// Half-open byte range `[start, start + size)`. Always non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: Addr,
    pub size: u64,
}

impl AddressRange {
    /// Validated constructor: a zero address or zero size is engine misuse,
    /// as is a range whose end wraps the address space. Every trace-record
    /// range passes through here, so `end()` cannot overflow downstream.
    pub fn new(start: Addr, size: u64) -> Result<Self> {
        if start == 0 || size == 0 {
            return Err(EngineError::EmptyRange { addr: start, size });
        }
        if start.checked_add(size).is_none() {
            return Err(EngineError::RangeOverflow { addr: start, size });
        }
        Ok(Self { start, size })
    }

    pub fn end(&self) -> Addr {
        self.start + self.size
    }
}

/// Persistence state of one PM byte, coalesced internally into ranges of
/// uniform state.
///
/// - `Clean`: registered, never modified since allocation or the last
///   consistent point
/// - `Modified`: written, not yet flushed
/// - `WritebackPending`: flushed, not yet drained
/// - `WrittenBack`: drained, durability not yet logically confirmed
/// - `Consistent`: confirmed durable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistenceState {
    Clean,
    Modified,
    WritebackPending,
    WrittenBack,
    Consistent,
}

impl PersistenceState {
    /// Clean bytes were never modified, so they count as consistent.
    pub fn counts_consistent(&self) -> bool {
        matches!(self, PersistenceState::Consistent | PersistenceState::Clean)
    }
}
