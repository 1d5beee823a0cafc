//! Error types.
//!
//! Only engine-misuse invariant violations are errors; bugs detected in the
//! subject program go through the report channel and never abort replay.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("empty or null address range: addr {addr:#x}, size {size}")]
    EmptyRange { addr: u64, size: u64 },

    #[error("address range wraps the address space: addr {addr:#x}, size {size:#x}")]
    RangeOverflow { addr: u64, size: u64 },

    #[error("allocate on existing PM locations: [{addr:#x}, +{size})")]
    DoubleAllocate { addr: u64, size: u64 },

    #[error("deallocating unallocated memory: [{addr:#x}, +{size})")]
    DeallocateUnallocated { addr: u64, size: u64 },

    #[error("modify of non-PM address: [{addr:#x}, +{size})")]
    ModifyNonPm { addr: u64, size: u64 },

    #[error("consistency check on non-PM address: [{addr:#x}, +{size})")]
    CheckNonPm { addr: u64, size: u64 },

    #[error("state query on unregistered range: [{addr:#x}, +{size})")]
    QueryUnallocated { addr: u64, size: u64 },

    #[error("non-PM address is never consistent: [{addr:#x}, +{size})")]
    NonPmNeverConsistent { addr: u64, size: u64 },

    #[error("transaction end without matching begin on thread {tid}")]
    TxEndWithoutBegin { tid: u32 },

    #[error("internal-function exit without matching enter on thread {tid}")]
    InternalExitWithoutEnter { tid: u32 },

    #[error("thread id {tid} exceeds the configured bound {max}")]
    ThreadIdOutOfRange { tid: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, EngineError>;
